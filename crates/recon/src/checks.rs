use serde::Deserialize;

use crate::config::normalize_column;
use crate::model::{CheckFinding, Dataset, Field};
use crate::predicate::Predicate;

/// A named row filter flagging suspicious rows. No recomputation is involved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSpec {
    pub name: String,
    pub when: Predicate,
    /// Columns shown with each finding.
    #[serde(default)]
    pub show: Vec<String>,
}

impl CheckSpec {
    pub(crate) fn normalize_columns(&mut self) {
        self.when.normalize_columns();
        for column in &mut self.show {
            *column = normalize_column(column);
        }
    }
}

/// Findings ordered by check, then by row.
pub fn run_checks(dataset: &Dataset, checks: &[CheckSpec], date_column: &str) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    for check in checks {
        for row in dataset.rows.iter().filter(|row| check.when.matches(row)) {
            findings.push(CheckFinding {
                check: check.name.clone(),
                row_number: dataset.row_number(row),
                date: row.raw(date_column),
                fields: check
                    .show
                    .iter()
                    .map(|column| Field {
                        column: column.clone(),
                        value: row.raw(column),
                    })
                    .collect(),
            });
        }
    }
    findings
}
