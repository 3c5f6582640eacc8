//! Sheet name → ruleset dispatch.

use std::collections::{HashMap, HashSet};

use crate::config::Ruleset;
use crate::error::ReconError;

/// Rulesets shipped with the engine, one TOML document per vendor family.
pub const BUILTIN_RULESETS: &[(&str, &str)] = &[
    ("waters_tuck_shop.toml", include_str!("../rulesets/waters_tuck_shop.toml")),
    ("fruit_n_juice.toml", include_str!("../rulesets/fruit_n_juice.toml")),
    ("csg_pune.toml", include_str!("../rulesets/csg_pune.toml")),
    ("sharefile_wallet.toml", include_str!("../rulesets/sharefile_wallet.toml")),
    ("airtel_tiered_mg.toml", include_str!("../rulesets/airtel_tiered_mg.toml")),
    ("airtel_noida.toml", include_str!("../rulesets/airtel_noida.toml")),
    ("airtel_noc.toml", include_str!("../rulesets/airtel_noc.toml")),
    ("airtel_jaya.toml", include_str!("../rulesets/airtel_jaya.toml")),
];

#[derive(Debug, Clone, Default)]
pub struct Registry {
    rulesets: Vec<Ruleset>,
    by_sheet: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in rulesets.
    pub fn builtin() -> Result<Self, ReconError> {
        let mut registry = Self::new();
        registry.extend(parse_sources(BUILTIN_RULESETS.iter().map(|(_, src)| *src))?)?;
        Ok(registry)
    }

    /// Register a batch. Names must be unique inside the batch; a name already
    /// registered is replaced. Sheet claims are checked for the whole batch
    /// before anything changes, so a rejected batch leaves the registry as it was.
    pub fn extend(&mut self, batch: Vec<Ruleset>) -> Result<(), ReconError> {
        let mut names = HashSet::new();
        for ruleset in &batch {
            if !names.insert(ruleset.name.as_str()) {
                return Err(ReconError::DuplicateRuleset(ruleset.name.clone()));
            }
        }

        let mut claims: HashMap<&str, &str> = self
            .rulesets
            .iter()
            .filter(|r| !names.contains(r.name.as_str()))
            .flat_map(|r| r.sheets.iter().map(move |s| (s.as_str(), r.name.as_str())))
            .collect();
        for ruleset in &batch {
            for sheet in &ruleset.sheets {
                match claims.insert(sheet.as_str(), ruleset.name.as_str()) {
                    Some(first) if first != ruleset.name => {
                        return Err(ReconError::DuplicateSheet {
                            sheet: sheet.clone(),
                            first: first.to_string(),
                            second: ruleset.name.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        for ruleset in batch {
            match self.rulesets.iter().position(|r| r.name == ruleset.name) {
                Some(idx) => {
                    log::debug!("ruleset '{}' replaced", ruleset.name);
                    self.rulesets[idx] = ruleset;
                }
                None => self.rulesets.push(ruleset),
            }
        }
        self.by_sheet = self
            .rulesets
            .iter()
            .enumerate()
            .flat_map(|(idx, r)| r.sheets.iter().map(move |s| (s.clone(), idx)))
            .collect();
        Ok(())
    }

    pub fn register(&mut self, ruleset: Ruleset) -> Result<(), ReconError> {
        self.extend(vec![ruleset])
    }

    /// Exact sheet-name match. `None` means the sheet has no ruleset.
    pub fn resolve_ruleset(&self, sheet: &str) -> Option<&Ruleset> {
        let found = self.by_sheet.get(sheet).map(|&idx| &self.rulesets[idx]);
        match found {
            Some(rs) => log::debug!("sheet '{sheet}' dispatched to ruleset '{}'", rs.name),
            None => log::debug!("sheet '{sheet}' has no ruleset"),
        }
        found
    }

    pub fn rulesets(&self) -> &[Ruleset] {
        &self.rulesets
    }

    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

fn parse_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> Result<Vec<Ruleset>, ReconError> {
    sources.into_iter().map(Ruleset::from_toml).collect()
}
