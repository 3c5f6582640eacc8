use std::collections::HashSet;

use serde::Deserialize;

use crate::aggregate::{AggregationSpec, Reducer};
use crate::checks::CheckSpec;
use crate::error::ReconError;
use crate::expr::{Expr, TieredLookup};
use crate::ledger::LedgerSpec;
use crate::parse;
use crate::pivot::PivotSpec;

pub const DEFAULT_DATE_COLUMN: &str = "date";

// ---------------------------------------------------------------------------
// Compiled ruleset
// ---------------------------------------------------------------------------

/// Everything needed to reconcile one vendor family's sheet.
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub name: String,
    pub version: u32,
    pub description: String,
    /// Sheet display names dispatched to this ruleset.
    pub sheets: Vec<String>,
    pub date_column: String,
    /// Absolute tolerance for the mismatch comparison. `None` is exact.
    pub tolerance: Option<f64>,
    pub rules: Vec<FieldRule>,
    pub aggregate: AggregationSpec,
    pub ledger: Option<LedgerSpec>,
    pub pivot: Option<PivotSpec>,
    pub checks: Vec<CheckSpec>,
}

/// `target` is the column being validated; `formula` recomputes it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub target: String,
    pub formula: Expr,
}

impl FieldRule {
    pub fn new(target: &str, formula: Expr) -> Self {
        Self {
            target: target.to_string(),
            formula,
        }
    }
}

// ---------------------------------------------------------------------------
// TOML shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesetConfig {
    name: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    description: String,
    sheets: Vec<String>,
    #[serde(default)]
    date_column: Option<String>,
    #[serde(default)]
    tolerance: Option<f64>,
    #[serde(default)]
    rules: Vec<RuleConfig>,
    #[serde(default)]
    aggregate: AggregationSpec,
    #[serde(default)]
    ledger: Option<LedgerSpec>,
    #[serde(default)]
    pivot: Option<PivotSpec>,
    #[serde(default)]
    checks: Vec<CheckSpec>,
}

fn default_version() -> u32 {
    1
}

/// A rule is either a formula string or a tiered lookup table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleConfig {
    target: String,
    #[serde(default)]
    expr: Option<String>,
    #[serde(default)]
    tiered: Option<TieredLookup>,
}

impl RuleConfig {
    fn compile(self) -> Result<FieldRule, ReconError> {
        let target = normalize_column(&self.target);
        if target.is_empty() {
            return Err(ReconError::ConfigValidation("rule with empty target".into()));
        }
        let formula = match (self.expr, self.tiered) {
            (Some(src), None) => parse::parse(&src).map_err(|message| ReconError::FormulaParse {
                target: target.clone(),
                message,
            })?,
            (None, Some(mut tiered)) => {
                tiered.key = normalize_column(&tiered.key);
                tiered.normalize().map_err(|message| ReconError::FormulaParse {
                    target: target.clone(),
                    message,
                })?;
                Expr::Tiered(tiered)
            }
            (Some(_), Some(_)) => {
                return Err(ReconError::ConfigValidation(format!(
                    "rule '{target}': set either expr or tiered, not both"
                )))
            }
            (None, None) => {
                return Err(ReconError::ConfigValidation(format!(
                    "rule '{target}': missing expr or tiered"
                )))
            }
        };
        Ok(FieldRule { target, formula })
    }
}

/// Same normalization the sheet headers get.
pub(crate) fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Ruleset {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RulesetConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;

        let date_column = config
            .date_column
            .map(|c| normalize_column(&c))
            .unwrap_or_else(|| DEFAULT_DATE_COLUMN.to_string());

        let rules = config
            .rules
            .into_iter()
            .map(RuleConfig::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut aggregate = config.aggregate;
        aggregate.normalize_columns();
        if let Some(days) = aggregate.days.as_mut() {
            days.date_column.get_or_insert_with(|| date_column.clone());
        }
        let mut ledger = config.ledger;
        if let Some(ledger) = ledger.as_mut() {
            ledger.normalize_columns();
            ledger.date_column.get_or_insert_with(|| date_column.clone());
        }
        let mut pivot = config.pivot;
        if let Some(pivot) = pivot.as_mut() {
            pivot.normalize_columns();
        }
        let mut checks = config.checks;
        checks.iter_mut().for_each(CheckSpec::normalize_columns);

        let ruleset = Ruleset {
            name: config.name,
            version: config.version,
            description: config.description,
            sheets: config.sheets,
            date_column,
            tolerance: config.tolerance,
            rules,
            aggregate,
            ledger,
            pivot,
            checks,
        };
        ruleset.validate()?;
        Ok(ruleset)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("ruleset name is empty".into()));
        }

        if self.sheets.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "ruleset '{}': at least one sheet is required",
                self.name
            )));
        }

        if let Some(tol) = self.tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': tolerance must be a non-negative number, got {tol}",
                    self.name
                )));
            }
        }

        // Aggregate labels must be unique so the mapping is well defined
        let mut labels = HashSet::new();
        let days_label = self.aggregate.days.as_ref().map(|d| d.label.as_str());
        for label in days_label.into_iter().chain(self.aggregate.metrics.iter().map(|m| m.label.as_str())) {
            if !labels.insert(label) {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': duplicate aggregate label '{label}'",
                    self.name
                )));
            }
        }

        for metric in &self.aggregate.metrics {
            if metric.reduce == Reducer::Sum && metric.column.is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': aggregate '{}' sums no column",
                    self.name, metric.label
                )));
            }
        }

        if let Some(ledger) = &self.ledger {
            if ledger.columns.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': ledger needs at least one column",
                    self.name
                )));
            }
        }

        if let Some(pivot) = &self.pivot {
            if pivot.group_by.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': pivot needs at least one group_by column",
                    self.name
                )));
            }
        }

        let mut check_names = HashSet::new();
        for check in &self.checks {
            if !check_names.insert(check.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "ruleset '{}': duplicate check '{}'",
                    self.name, check.name
                )));
            }
        }

        Ok(())
    }

    /// Every column a field rule reads or validates, in first-use order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for column in std::iter::once(rule.target.as_str()).chain(rule.formula.referenced_columns()) {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
