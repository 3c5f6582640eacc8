use std::fmt;

/// Ruleset configuration errors. Raised at load time, never during a run.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Ruleset validation error (no sheets, unordered bands, etc.).
    ConfigValidation(String),
    /// A rule's formula string could not be parsed.
    FormulaParse { target: String, message: String },
    /// Two rulesets share a name inside one source.
    DuplicateRuleset(String),
    /// A sheet name is claimed by two rulesets.
    DuplicateSheet { sheet: String, first: String, second: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "ruleset parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "ruleset validation error: {msg}"),
            Self::FormulaParse { target, message } => {
                write!(f, "rule '{target}': cannot parse formula: {message}")
            }
            Self::DuplicateRuleset(name) => write!(f, "duplicate ruleset name: {name}"),
            Self::DuplicateSheet { sheet, first, second } => {
                write!(f, "sheet '{sheet}' is claimed by both '{first}' and '{second}'")
            }
        }
    }
}

impl std::error::Error for ReconError {}

/// A computation fault inside one row. The row is skipped, the batch continues.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// Denominator evaluated to zero.
    DivisionByZero { expr: String },
    /// A column used arithmetically holds text.
    NotNumeric { column: String, value: String },
    /// An undefined tiered lookup was used as an arithmetic operand.
    UndefinedOperand { expr: String },
    /// Arithmetic overflowed to infinity or NaN.
    NonFinite { expr: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero { expr } => write!(f, "division by zero in {expr}"),
            Self::NotNumeric { column, value } => {
                write!(f, "column '{column}' is not numeric: '{value}'")
            }
            Self::UndefinedOperand { expr } => {
                write!(f, "undefined lookup used in arithmetic: {expr}")
            }
            Self::NonFinite { expr } => write!(f, "non-finite result in {expr}"),
        }
    }
}

impl std::error::Error for RowError {}
