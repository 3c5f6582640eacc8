//! Cell scalars and the default-to-zero column resolver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Row;

/// An untyped cell value. `Missing` is distinct from `Number(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Missing,
}

/// Cell spellings treated as "not a value".
const MISSING_MARKERS: &[&str] = &["", "nan", "null", "none", "n/a", "na", "#n/a"];

impl Scalar {
    /// Classify a raw cell string: missing marker, number, or text.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
            return Scalar::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Scalar::Number(n),
            Ok(_) => Scalar::Missing,
            Err(_) => Scalar::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True for values a ledger or filter treats as "present": not missing and not zero.
    pub fn is_present_nonzero(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0,
            Scalar::Text(_) => true,
            Scalar::Missing => false,
        }
    }

    /// Key used for categorical comparisons (trimmed, lower-case).
    pub fn category_key(&self) -> Option<String> {
        match self {
            Scalar::Missing => None,
            other => Some(other.to_string().trim().to_lowercase()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Missing => Ok(()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Look up `column` in `row`. Absent columns and missing cells resolve to `0`.
///
/// Never fails: callers that need a number decide what to do with text.
pub fn resolve(row: &Row, column: &str) -> Scalar {
    match row.get(column) {
        Some(Scalar::Missing) | None => Scalar::Number(0.0),
        Some(value) => value.clone(),
    }
}
