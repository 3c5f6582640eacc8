//! `mischeck check` and `mischeck periods`.

use std::path::{Path, PathBuf};

use mischeck_recon::{sheet_outcome, SheetOutcome};

use crate::exit_codes::EXIT_MISMATCH;
use crate::render::render_report;
use crate::rulesets::load_registry;
use crate::settings::Settings;
use crate::sheet::{read_sheet, PeriodSelection, SheetOptions};
use crate::CliError;

pub struct CheckArgs {
    pub file: PathBuf,
    pub sheet: Option<String>,
    pub period: Option<String>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub header_row: Option<usize>,
    pub rules: Option<PathBuf>,
}

/// Sheet name used for dispatch: explicit, else the file stem.
fn sheet_name(file: &Path, explicit: Option<String>) -> Result<String, CliError> {
    if let Some(name) = explicit {
        return Ok(name);
    }
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::args(format!("cannot derive a sheet name from {}", file.display())))
}

fn emit_json(value: &serde_json::Value, output: Option<&Path>, to_stdout: bool) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if to_stdout {
        println!("{json_str}");
    }
    Ok(())
}

pub fn cmd_check(args: CheckArgs, settings: &Settings) -> Result<(), CliError> {
    let rules_dir = args.rules.as_deref().or(settings.rules_dir.as_deref());
    let registry = load_registry(rules_dir)?;
    let sheet = sheet_name(&args.file, args.sheet)?;

    let ruleset = registry.resolve_ruleset(&sheet);
    let date_column = ruleset
        .map(|r| r.date_column.clone())
        .unwrap_or_else(|| settings.date_column.clone());
    let opts = SheetOptions {
        header_row: args.header_row.unwrap_or(settings.header_row),
        period_column: settings.period_column.clone(),
        date_column,
    };
    let parsed = read_sheet(&args.file, &opts)?;

    let (period, dataset) = match parsed.select_period(args.period.as_deref())? {
        PeriodSelection::Selected { period, dataset } => (period, dataset),
        PeriodSelection::NoPeriodColumn => {
            if args.json || args.output.is_some() {
                let value = serde_json::json!({ "status": "no_period_column", "sheet": sheet });
                emit_json(&value, args.output.as_deref(), args.json)?;
            }
            eprintln!("'{sheet}': no '{}' column, nothing to review", opts.period_column);
            return Ok(());
        }
    };

    let outcome = sheet_outcome(&sheet, ruleset, &dataset);

    if args.json || args.output.is_some() {
        let mut value = serde_json::to_value(&outcome)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("period".to_string(), serde_json::Value::String(period.clone()));
        }
        emit_json(&value, args.output.as_deref(), args.json)?;
    }

    let report = match outcome {
        SheetOutcome::Checked(report) => report,
        SheetOutcome::Unsupported { sheet } => {
            eprintln!("'{sheet}': no ruleset for this sheet, not reviewed");
            return Ok(());
        }
    };

    if !args.json {
        print!("{}", render_report(&report, Some(period.as_str())));
    }

    let s = &report.summary;
    eprintln!(
        "{}: {} rows, {} mismatches in {} rows, {} skipped",
        sheet, s.rows, s.mismatches, s.mismatched_rows, s.rows_skipped
    );

    if s.mismatches > 0 {
        return Err(CliError {
            code: EXIT_MISMATCH,
            message: format!("{} mismatches found", s.mismatches),
            hint: None,
        });
    }
    Ok(())
}

pub fn cmd_periods(file: PathBuf, header_row: Option<usize>, settings: &Settings) -> Result<(), CliError> {
    let opts = SheetOptions {
        header_row: header_row.unwrap_or(settings.header_row),
        period_column: settings.period_column.clone(),
        date_column: settings.date_column.clone(),
    };
    let parsed = read_sheet(&file, &opts)?;
    match parsed.periods() {
        Some(periods) => {
            for period in periods {
                println!("{period}");
            }
        }
        None => eprintln!("{}: no '{}' column", file.display(), opts.period_column),
    }
    Ok(())
}
