use crate::aggregate::aggregate;
use crate::checks::run_checks;
use crate::config::Ruleset;
use crate::evaluate::evaluate_dataset;
use crate::evidence::compute_summary;
use crate::ledger::extract;
use crate::model::{Dataset, ReconMeta, ReconReport, SheetOutcome};
use crate::pivot::pivot;
use crate::registry::Registry;

/// Run one ruleset over one period's dataset. Never fails: faulting rows are
/// reported in `failures`, everything else is data.
pub fn run(ruleset: &Ruleset, dataset: &Dataset) -> ReconReport {
    for column in ruleset.referenced_columns() {
        if !dataset.columns.is_empty() && !dataset.has_column(column) {
            log::debug!("column '{column}' absent from sheet, resolving to 0");
        }
    }

    let evaluation = evaluate_dataset(dataset, ruleset);
    let aggregates = aggregate(dataset, &ruleset.aggregate);
    let ledger = ruleset
        .ledger
        .as_ref()
        .map(|spec| extract(dataset, spec))
        .unwrap_or_default();
    let pivot = ruleset.pivot.as_ref().map(|spec| pivot(dataset, spec));
    let checks = run_checks(dataset, &ruleset.checks, &ruleset.date_column);

    let summary = compute_summary(dataset.len(), &evaluation, ledger.len(), checks.len());
    log::info!(
        "ruleset '{}': {} rows, {} mismatches, {} skipped",
        ruleset.name,
        summary.rows,
        summary.mismatches,
        summary.rows_skipped
    );

    ReconReport {
        meta: ReconMeta {
            ruleset: ruleset.name.clone(),
            ruleset_version: ruleset.version,
            sheet: None,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        mismatches: evaluation.mismatches,
        failures: evaluation.failures,
        aggregates,
        ledger,
        pivot,
        checks,
    }
}

/// Dispatch a sheet by name. A sheet with no ruleset is a normal outcome.
pub fn check_sheet(registry: &Registry, sheet: &str, dataset: &Dataset) -> SheetOutcome {
    sheet_outcome(sheet, registry.resolve_ruleset(sheet), dataset)
}

/// Outcome for a sheet whose ruleset lookup has already been done.
pub fn sheet_outcome(sheet: &str, ruleset: Option<&Ruleset>, dataset: &Dataset) -> SheetOutcome {
    match ruleset {
        Some(ruleset) => {
            let mut report = run(ruleset, dataset);
            report.meta.sheet = Some(sheet.to_string());
            SheetOutcome::Checked(Box::new(report))
        }
        None => SheetOutcome::Unsupported {
            sheet: sheet.to_string(),
        },
    }
}
