// mischeck - review monthly vendor MIS billing sheets from the command line

mod check;
mod exit_codes;
mod logging;
mod render;
mod rulesets;
mod settings;
mod sheet;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mischeck")]
#[command(about = "Recompute vendor MIS billing sheets and flag every cell that disagrees")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check one exported sheet against its vendor ruleset
    #[command(after_help = "\
Examples:
  mischeck check 'Waters Tuck Shop.csv'
  mischeck check march.csv --sheet 'Airtel Noida' --period Mar-24
  mischeck check 'CSG-Pune.csv' --json
  mischeck check 'CSG-Pune.csv' --output report.json

Exit codes:
  0  no mismatches (or the sheet has no ruleset)
  1  mismatches found")]
    Check {
        /// CSV export of the sheet
        file: PathBuf,

        /// Sheet name used to pick the ruleset (default: file name without extension)
        #[arg(long)]
        sheet: Option<String>,

        /// Reporting period to review (value of the period column)
        #[arg(long)]
        period: Option<String>,

        /// Output JSON to stdout instead of tables
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// 0-based line index of the header row
        #[arg(long)]
        header_row: Option<usize>,

        /// Directory of extra ruleset .toml files
        #[arg(long, env = "MISCHECK_RULES")]
        rules: Option<PathBuf>,
    },

    /// List the reporting periods found in a sheet
    #[command(after_help = "\
Examples:
  mischeck periods 'Airtel Jaya.csv'")]
    Periods {
        /// CSV export of the sheet
        file: PathBuf,

        /// 0-based line index of the header row
        #[arg(long)]
        header_row: Option<usize>,
    },

    /// Inspect vendor rulesets
    Rulesets {
        #[command(subcommand)]
        command: rulesets::RulesetCommands,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let settings = settings::Settings::load();

    let result = match cli.command {
        Commands::Check {
            file,
            sheet,
            period,
            json,
            output,
            header_row,
            rules,
        } => check::cmd_check(
            check::CheckArgs { file, sheet, period, json, output, header_row, rules },
            &settings,
        ),
        Commands::Periods { file, header_row } => check::cmd_periods(file, header_row, &settings),
        Commands::Rulesets { command } => rulesets::cmd_rulesets(command, settings.rules_dir.clone()),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            eprintln!("error: {}", message);
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
