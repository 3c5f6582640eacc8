use std::collections::HashSet;

use serde::Deserialize;

use crate::config::normalize_column;
use crate::model::{AggregateEntry, AggregateValue, Dataset, Row};
use crate::predicate::Predicate;
use crate::value::{resolve, Scalar};

pub const DEFAULT_DAYS_LABEL: &str = "Number of Days";

/// Per-period summary definition: an optional active-day count followed by
/// labelled metrics, reported in declared order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationSpec {
    #[serde(default)]
    pub days: Option<DaysSpec>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
}

/// Distinct count of dates on rows matching `when`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaysSpec {
    #[serde(default = "default_days_label")]
    pub label: String,
    /// Filled from the ruleset's date column when omitted.
    #[serde(default)]
    pub date_column: Option<String>,
    #[serde(default)]
    pub when: Option<Predicate>,
}

fn default_days_label() -> String {
    DEFAULT_DAYS_LABEL.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    #[default]
    Sum,
    Count,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    pub label: String,
    /// Required for `sum`; ignored by `count`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub reduce: Reducer,
    #[serde(default, rename = "where")]
    pub filter: Option<Predicate>,
}

impl MetricSpec {
    fn accepts(&self, row: &Row) -> bool {
        self.filter.as_ref().map_or(true, |p| p.matches(row))
    }

    /// Reduce the rows this metric's filter accepts.
    pub fn reduce<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> AggregateValue {
        let matching = rows.into_iter().filter(|row| self.accepts(row));
        match (self.reduce, &self.column) {
            (Reducer::Count, _) => AggregateValue::Count(matching.count()),
            (Reducer::Sum, Some(column)) => {
                AggregateValue::Sum(total(matching.map(|row| numeric_or_zero(row, column)).collect()))
            }
            (Reducer::Sum, None) => AggregateValue::Sum(0.0),
        }
    }
}

/// Sum that does not depend on the order the values arrive in. Starts from
/// `+0.0`, so an empty sum is never negative zero.
pub(crate) fn total(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

// Missing and text both contribute nothing to a sum.
fn numeric_or_zero(row: &Row, column: &str) -> f64 {
    match resolve(row, column) {
        Scalar::Number(n) => n,
        _ => 0.0,
    }
}

impl AggregationSpec {
    pub(crate) fn normalize_columns(&mut self) {
        if let Some(days) = self.days.as_mut() {
            if let Some(column) = days.date_column.as_mut() {
                *column = normalize_column(column);
            }
            if let Some(when) = days.when.as_mut() {
                when.normalize_columns();
            }
        }
        for metric in &mut self.metrics {
            if let Some(column) = metric.column.as_mut() {
                *column = normalize_column(column);
            }
            if let Some(filter) = metric.filter.as_mut() {
                filter.normalize_columns();
            }
        }
    }
}

impl DaysSpec {
    pub fn count<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> usize {
        let date_column = self.date_column.as_deref().unwrap_or(crate::config::DEFAULT_DATE_COLUMN);
        let mut seen = HashSet::new();
        for row in rows {
            if self.when.as_ref().is_some_and(|p| !p.matches(row)) {
                continue;
            }
            let date = row.raw(date_column);
            if !date.is_missing() {
                seen.insert(date.to_string());
            }
        }
        seen.len()
    }
}

/// Compute the summary mapping. Labels come out in declared order, days first.
pub fn aggregate(dataset: &Dataset, spec: &AggregationSpec) -> Vec<AggregateEntry> {
    let mut entries = Vec::with_capacity(spec.metrics.len() + 1);
    if let Some(days) = &spec.days {
        entries.push(AggregateEntry {
            label: days.label.clone(),
            value: AggregateValue::Count(days.count(&dataset.rows)),
        });
    }
    for metric in &spec.metrics {
        entries.push(AggregateEntry {
            label: metric.label.clone(),
            value: metric.reduce(&dataset.rows),
        });
    }
    entries
}
