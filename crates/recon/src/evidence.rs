use std::collections::HashSet;

use crate::model::{Evaluation, ReconSummary};

/// Compute summary statistics for one run.
pub fn compute_summary(
    rows: usize,
    evaluation: &Evaluation,
    ledger_entries: usize,
    check_findings: usize,
) -> ReconSummary {
    let mismatched_rows: HashSet<usize> = evaluation.mismatches.iter().map(|m| m.row_number).collect();

    ReconSummary {
        rows,
        rows_processed: evaluation.rows_processed,
        rows_skipped: evaluation.failures.len(),
        mismatches: evaluation.mismatches.len(),
        mismatched_rows: mismatched_rows.len(),
        ledger_entries,
        check_findings,
    }
}
