use serde::Deserialize;

use crate::config::normalize_column;
use crate::expr::Comparison;
use crate::model::Row;
use crate::value::{resolve, Scalar};

/// Boolean row filter used by aggregation metrics, the active-day count,
/// and value-issue checks.
///
/// ```toml
/// where = { column = "order type", one_of = ["regular", "food trial"] }
/// where = { any = [{ column = "buying pax", cmp = "gt", value = 0 },
///                  { column = "selling pax", cmp = "gt", value = 0 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PredicateConfig")]
pub enum Predicate {
    Any { any: Vec<Predicate> },
    All { all: Vec<Predicate> },
    Not { not: Box<Predicate> },
    Compare { column: String, cmp: Comparison, value: f64 },
    Member { column: String, one_of: Vec<String> },
}

impl Predicate {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::Any { any } => any.iter().any(|p| p.matches(row)),
            Self::All { all } => all.iter().all(|p| p.matches(row)),
            Self::Not { not } => !not.matches(row),
            // Text never satisfies a numeric comparison.
            Self::Compare { column, cmp, value } => match resolve(row, column) {
                Scalar::Number(n) => cmp.apply(n, *value),
                _ => false,
            },
            Self::Member { column, one_of } => match row.raw(column).category_key() {
                Some(key) => one_of.iter().any(|v| v.trim().eq_ignore_ascii_case(&key)),
                None => false,
            },
        }
    }

    pub(crate) fn normalize_columns(&mut self) {
        match self {
            Self::Any { any: list } | Self::All { all: list } => {
                list.iter_mut().for_each(Predicate::normalize_columns)
            }
            Self::Not { not } => not.normalize_columns(),
            Self::Compare { column, .. } | Self::Member { column, .. } => {
                *column = normalize_column(column);
            }
        }
    }
}

// TOML shape. Each form is a closed table, so a misspelled key fails to
// match any form instead of being dropped.
#[derive(Deserialize)]
#[serde(untagged)]
enum PredicateConfig {
    Any(AnyConfig),
    All(AllConfig),
    Not(NotConfig),
    Compare(CompareConfig),
    Member(MemberConfig),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AnyConfig {
    any: Vec<Predicate>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AllConfig {
    all: Vec<Predicate>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NotConfig {
    not: Box<Predicate>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CompareConfig {
    column: String,
    cmp: Comparison,
    value: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MemberConfig {
    column: String,
    one_of: Vec<String>,
}

impl From<PredicateConfig> for Predicate {
    fn from(config: PredicateConfig) -> Self {
        match config {
            PredicateConfig::Any(c) => Self::Any { any: c.any },
            PredicateConfig::All(c) => Self::All { all: c.all },
            PredicateConfig::Not(c) => Self::Not { not: c.not },
            PredicateConfig::Compare(c) => Self::Compare {
                column: c.column,
                cmp: c.cmp,
                value: c.value,
            },
            PredicateConfig::Member(c) => Self::Member {
                column: c.column,
                one_of: c.one_of,
            },
        }
    }
}

/// Shorthand for the common "column > 0" filter.
pub fn positive(column: &str) -> Predicate {
    Predicate::Compare {
        column: column.to_string(),
        cmp: Comparison::Gt,
        value: 0.0,
    }
}
