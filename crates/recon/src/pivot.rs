use std::collections::BTreeMap;

use serde::Deserialize;

use crate::aggregate::total;
use crate::config::normalize_column;
use crate::model::{Dataset, PivotRow, PivotTable};
use crate::value::Scalar;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PivotSpec {
    pub group_by: Vec<String>,
    #[serde(default = "default_count_label")]
    pub count_label: String,
    #[serde(default)]
    pub means: Vec<MeanSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeanSpec {
    pub label: String,
    pub column: String,
}

impl PivotSpec {
    pub(crate) fn normalize_columns(&mut self) {
        for column in self.group_by.iter_mut().chain(self.means.iter_mut().map(|m| &mut m.column)) {
            *column = normalize_column(column);
        }
    }
}

fn default_count_label() -> String {
    "days".to_string()
}

#[derive(Default)]
struct Group {
    count: usize,
    /// Numeric values seen per mean column.
    values: Vec<Vec<f64>>,
}

/// Group rows by the configured key columns; count rows and average numeric
/// columns per group. Rows missing any key are dropped.
pub fn pivot(dataset: &Dataset, spec: &PivotSpec) -> PivotTable {
    let mut groups: BTreeMap<Vec<String>, Group> = BTreeMap::new();

    'rows: for row in &dataset.rows {
        let mut keys = Vec::with_capacity(spec.group_by.len());
        for column in &spec.group_by {
            let value = row.raw(column);
            if value.is_missing() {
                continue 'rows;
            }
            keys.push(value.to_string());
        }

        let group = groups.entry(keys).or_insert_with(|| Group {
            count: 0,
            values: vec![Vec::new(); spec.means.len()],
        });
        group.count += 1;
        for (values, mean) in group.values.iter_mut().zip(&spec.means) {
            if let Scalar::Number(n) = row.raw(&mean.column) {
                values.push(n);
            }
        }
    }

    PivotTable {
        group_by: spec.group_by.clone(),
        count_label: spec.count_label.clone(),
        mean_labels: spec.means.iter().map(|m| m.label.clone()).collect(),
        rows: groups
            .into_iter()
            .map(|(keys, group)| PivotRow {
                keys,
                count: group.count,
                means: group
                    .values
                    .into_iter()
                    .map(|values| {
                        let n = values.len();
                        (n > 0).then(|| total(values) / n as f64)
                    })
                    .collect(),
            })
            .collect(),
    }
}
