//! Row-wise recomputation of a ruleset's field rules.

use crate::config::Ruleset;
use crate::error::RowError;
use crate::mismatch::check;
use crate::model::{Dataset, Evaluation, Mismatch, Row, RowFailure};

/// A row fault tagged with the rule that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFault {
    pub target: String,
    pub error: RowError,
}

/// Apply every field rule in declared order to one row.
///
/// Each formula reads the row's stored values only; a rule never sees what an
/// earlier rule computed. The first faulting rule aborts the row.
pub fn evaluate(row: &Row, row_number: usize, ruleset: &Ruleset) -> Result<Vec<Mismatch>, RowError> {
    evaluate_row(row, row_number, ruleset).map_err(|fault| fault.error)
}

fn evaluate_row(row: &Row, row_number: usize, ruleset: &Ruleset) -> Result<Vec<Mismatch>, RuleFault> {
    let mut mismatches = Vec::new();
    for rule in &ruleset.rules {
        let expected = rule.formula.evaluate(row).map_err(|error| RuleFault {
            target: rule.target.clone(),
            error,
        })?;
        if let Some(m) = check(
            row,
            row_number,
            &ruleset.date_column,
            &rule.target,
            expected,
            ruleset.tolerance,
        ) {
            mismatches.push(m);
        }
    }
    Ok(mismatches)
}

/// Evaluate every row, isolating faults per row. Output keeps input row order.
pub fn evaluate_dataset(dataset: &Dataset, ruleset: &Ruleset) -> Evaluation {
    let mut out = Evaluation::default();
    for row in &dataset.rows {
        let row_number = dataset.row_number(row);
        match evaluate_row(row, row_number, ruleset) {
            Ok(mismatches) => {
                out.rows_processed += 1;
                out.mismatches.extend(mismatches);
            }
            Err(fault) => {
                log::warn!(
                    "row {row_number}: skipped, rule '{}': {}",
                    fault.target,
                    fault.error
                );
                out.failures.push(RowFailure {
                    row_number,
                    column: fault.target,
                    message: fault.error.to_string(),
                });
            }
        }
    }
    out
}
