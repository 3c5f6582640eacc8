//! Side-ledger extraction: expense entries recorded alongside the billing rows.

use serde::Deserialize;

use crate::config::normalize_column;
use crate::model::{Dataset, Field, LedgerEntry, Row};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerSpec {
    /// Trigger columns. A row joins the ledger when any of them is non-missing
    /// and non-zero. All are captured verbatim.
    pub columns: Vec<String>,
    /// Date reported with each entry. Filled from the ruleset's date column
    /// when omitted.
    #[serde(default)]
    pub date_column: Option<String>,
    /// Context columns captured verbatim but never used as triggers.
    #[serde(default)]
    pub include: Vec<String>,
}

impl LedgerSpec {
    pub(crate) fn normalize_columns(&mut self) {
        for column in self.columns.iter_mut().chain(&mut self.include) {
            *column = normalize_column(column);
        }
        if let Some(column) = self.date_column.as_mut() {
            *column = normalize_column(column);
        }
    }

    pub fn is_entry(&self, row: &Row) -> bool {
        self.columns.iter().any(|c| row.raw(c).is_present_nonzero())
    }
}

pub fn extract(dataset: &Dataset, spec: &LedgerSpec) -> Vec<LedgerEntry> {
    let date_column = spec.date_column.as_deref().unwrap_or(crate::config::DEFAULT_DATE_COLUMN);
    dataset
        .rows
        .iter()
        .filter(|row| spec.is_entry(row))
        .map(|row| LedgerEntry {
            row_number: dataset.row_number(row),
            date: row.raw(date_column),
            fields: spec
                .columns
                .iter()
                .chain(&spec.include)
                .map(|column| Field {
                    column: column.clone(),
                    value: row.raw(column),
                })
                .collect(),
        })
        .collect()
}
