use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::value::Scalar;

/// Sheet rows above the first data row (title line + header line).
pub const DEFAULT_ROW_OFFSET: usize = 2;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One normalized sheet row. Read-only during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position among the sheet's data rows (before period filtering).
    pub position: usize,
    pub values: HashMap<String, Scalar>,
}

impl Row {
    pub fn new<K: Into<String>>(position: usize, values: impl IntoIterator<Item = (K, Scalar)>) -> Self {
        Self {
            position,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.values.get(column)
    }

    /// Raw value of a column, `Missing` when the column is absent.
    pub fn raw(&self, column: &str) -> Scalar {
        self.values.get(column).cloned().unwrap_or(Scalar::Missing)
    }
}

/// A sheet already filtered to one reporting period.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Added to `Row::position` to get the human-readable sheet row number.
    pub row_offset: usize,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            row_offset: DEFAULT_ROW_OFFSET,
        }
    }

    pub fn with_row_offset(mut self, row_offset: usize) -> Self {
        self.row_offset = row_offset;
        self
    }

    pub fn row_number(&self, row: &Row) -> usize {
        row.position + self.row_offset
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Mismatches
// ---------------------------------------------------------------------------

/// A recomputed value. `Undefined` comes from a tiered lookup whose category
/// (or band) is unknown and never equals a reported value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expected {
    Value(f64),
    Undefined,
}

impl Serialize for Expected {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(n) => serializer.serialize_f64(*n),
            Self::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(n) => Scalar::Number(*n).fmt(f),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub row_number: usize,
    pub date: Scalar,
    pub column: String,
    pub expected: Expected,
    pub actual: Scalar,
}

/// A row excluded from mismatch output because one of its formulas faulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub row_number: usize,
    pub column: String,
    pub message: String,
}

/// Row-evaluation outcome for a whole dataset, in input row order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    pub rows_processed: usize,
    pub mismatches: Vec<Mismatch>,
    pub failures: Vec<RowFailure>,
}

// ---------------------------------------------------------------------------
// Aggregates, ledger, pivot, checks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateValue {
    Sum(f64),
    Count(usize),
}

impl AggregateValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Sum(v) => *v,
            Self::Count(n) => *n as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateEntry {
    pub label: String,
    pub value: AggregateValue,
}

/// Look up an aggregate by label.
pub fn aggregate_value(entries: &[AggregateEntry], label: &str) -> Option<AggregateValue> {
    entries.iter().find(|e| e.label == label).map(|e| e.value)
}

/// A column captured verbatim from a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub column: String,
    pub value: Scalar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub row_number: usize,
    pub date: Scalar,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub keys: Vec<String>,
    pub count: usize,
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub group_by: Vec<String>,
    pub count_label: String,
    pub mean_labels: Vec<String>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckFinding {
    pub check: String,
    pub row_number: usize,
    pub date: Scalar,
    pub fields: Vec<Field>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub ruleset: String,
    pub ruleset_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub rows: usize,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub mismatches: usize,
    pub mismatched_rows: usize,
    pub ledger_entries: usize,
    pub check_findings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub mismatches: Vec<Mismatch>,
    pub failures: Vec<RowFailure>,
    pub aggregates: Vec<AggregateEntry>,
    pub ledger: Vec<LedgerEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<PivotTable>,
    pub checks: Vec<CheckFinding>,
}

/// Result of dispatching a sheet to the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SheetOutcome {
    Checked(Box<ReconReport>),
    Unsupported { sheet: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mismatch_json_shape() {
        let m = Mismatch {
            row_number: 7,
            date: Scalar::from("03-Mar-24"),
            column: "buying price ai".into(),
            expected: Expected::Undefined,
            actual: Scalar::Number(49.0),
        };
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({
                "row_number": 7,
                "date": "03-Mar-24",
                "column": "buying price ai",
                "expected": "undefined",
                "actual": 49.0,
            })
        );
    }

    #[test]
    fn unsupported_outcome_is_tagged() {
        let outcome = SheetOutcome::Unsupported { sheet: "Waters Event".into() };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "status": "unsupported", "sheet": "Waters Event" })
        );
    }

    #[test]
    fn aggregate_values_serialize_bare() {
        let entries = vec![
            AggregateEntry { label: "Number of Days".into(), value: AggregateValue::Count(3) },
            AggregateEntry { label: "Commission".into(), value: AggregateValue::Sum(12.5) },
        ];
        assert_eq!(
            serde_json::to_value(&entries).unwrap(),
            json!([
                { "label": "Number of Days", "value": 3 },
                { "label": "Commission", "value": 12.5 },
            ])
        );
        assert_eq!(aggregate_value(&entries, "Commission"), Some(AggregateValue::Sum(12.5)));
        assert_eq!(aggregate_value(&entries, "Amount"), None);
    }

    #[test]
    fn row_numbers_use_offset() {
        let row = Row::new(4, [("wallet", Scalar::Number(1.0))]);
        let data = Dataset::new(vec!["wallet".into()], vec![row.clone()]);
        assert_eq!(data.row_number(&row), 6);
        assert_eq!(data.clone().with_row_offset(5).row_number(&row), 9);
        assert_eq!(row.raw("cash"), Scalar::Missing);
    }
}
