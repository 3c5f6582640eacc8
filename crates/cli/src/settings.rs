// Reviewer settings
// Loaded from ~/.config/mischeck/settings.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// 0-based line index of the header in an exported sheet.
    pub header_row: usize,
    pub period_column: String,
    pub date_column: String,
    /// Extra ruleset directory, loaded on top of the built-in rulesets.
    pub rules_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_row: 1,
            period_column: "month".to_string(),
            date_column: "date".to_string(),
            rules_dir: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mischeck");
        config_dir.join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {e}; using default settings", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {e}; using default settings", path.display());
                Self::default()
            }
        }
    }
}
