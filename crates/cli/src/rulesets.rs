//! `mischeck rulesets`: list and validate vendor rulesets, and build the
//! registry every other command dispatches through.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use mischeck_recon::{Registry, Ruleset};

use crate::exit_codes::EXIT_INVALID_RULESET;
use crate::CliError;

#[derive(Subcommand)]
pub enum RulesetCommands {
    /// List the rulesets and the sheets they claim
    #[command(after_help = "\
Examples:
  mischeck rulesets list
  mischeck rulesets list --json
  mischeck rulesets list --rules ./vendor-rules")]
    List {
        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Directory of extra ruleset .toml files
        #[arg(long, env = "MISCHECK_RULES")]
        rules: Option<PathBuf>,
    },

    /// Parse and validate a ruleset file without running it
    #[command(after_help = "\
Examples:
  mischeck rulesets validate airtel_new_site.toml")]
    Validate {
        /// Path to the ruleset .toml file
        file: PathBuf,
    },
}

pub fn cmd_rulesets(cmd: RulesetCommands, default_rules: Option<PathBuf>) -> Result<(), CliError> {
    match cmd {
        RulesetCommands::List { json, rules } => cmd_rulesets_list(json, rules.or(default_rules)),
        RulesetCommands::Validate { file } => cmd_rulesets_validate(&file),
    }
}

fn ruleset_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_INVALID_RULESET, message: msg.into(), hint: None }
}

fn load_ruleset_file(path: &Path) -> Result<Ruleset, CliError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    Ruleset::from_toml(&source).map_err(|e| ruleset_err(format!("{}: {e}", path.display())))
}

/// Built-in rulesets, overlaid with every `*.toml` file in `rules_dir`.
pub fn load_registry(rules_dir: Option<&Path>) -> Result<Registry, CliError> {
    let mut registry = Registry::builtin().map_err(|e| ruleset_err(format!("built-in rulesets: {e}")))?;

    let Some(dir) = rules_dir else {
        return Ok(registry);
    };

    let entries = std::fs::read_dir(dir)
        .map_err(|e| CliError::io(format!("cannot read rules directory {}: {e}", dir.display())))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    let batch = paths
        .iter()
        .map(|p| load_ruleset_file(p))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("loaded {} ruleset(s) from {}", batch.len(), dir.display());

    registry.extend(batch).map_err(|e| CliError {
        code: EXIT_INVALID_RULESET,
        message: e.to_string(),
        hint: Some(format!("check the rulesets in {}", dir.display())),
    })?;
    Ok(registry)
}

fn cmd_rulesets_list(json_output: bool, rules: Option<PathBuf>) -> Result<(), CliError> {
    let registry = load_registry(rules.as_deref())?;

    if json_output {
        let list: Vec<serde_json::Value> = registry
            .rulesets()
            .iter()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "version": r.version,
                    "description": r.description,
                    "sheets": r.sheets,
                    "rules": r.rules.len(),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&list)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    for r in registry.rulesets() {
        println!("{} v{} ({} rules)", r.name, r.version, r.rules.len());
        if !r.description.is_empty() {
            println!("  {}", r.description);
        }
        for sheet in &r.sheets {
            println!("  - {sheet}");
        }
    }
    Ok(())
}

fn cmd_rulesets_validate(path: &Path) -> Result<(), CliError> {
    let ruleset = load_ruleset_file(path)?;
    eprintln!(
        "{}: ruleset '{}' v{} is valid ({} rules, {} sheets)",
        path.display(),
        ruleset.name,
        ruleset.version,
        ruleset.rules.len(),
        ruleset.sheets.len()
    );
    Ok(())
}
