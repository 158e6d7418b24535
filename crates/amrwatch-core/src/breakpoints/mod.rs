pub mod builtin;
pub mod schema;

use crate::error::AmrError;
use crate::parsing::{normalize_antibiotic, normalize_organism};
use schema::BreakpointTable;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Load a breakpoint table from a JSON file.
pub fn load_table(path: &Path) -> Result<BreakpointTable, AmrError> {
    let content = std::fs::read_to_string(path).map_err(|e| AmrError::BreakpointLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_table(&content, path)
}

/// Parse a breakpoint table from a JSON string.
pub fn parse_table(json: &str, source: &Path) -> Result<BreakpointTable, AmrError> {
    let table: BreakpointTable =
        serde_json::from_str(json).map_err(|e| AmrError::BreakpointLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_table(&table)?;
    Ok(table)
}

/// Parse a breakpoint table from a JSON string (no file path context).
pub fn parse_table_str(json: &str) -> Result<BreakpointTable, AmrError> {
    let table: BreakpointTable = serde_json::from_str(json).map_err(AmrError::Json)?;
    validate_table(&table)?;
    Ok(table)
}

/// Validate that a breakpoint table is well-formed.
pub fn validate_table(table: &BreakpointTable) -> Result<(), AmrError> {
    if table.version.trim().is_empty() {
        return Err(AmrError::BreakpointInvalid(
            "version must not be empty".into(),
        ));
    }

    if table.entries.is_empty() {
        return Err(AmrError::BreakpointInvalid(
            "entries must not be empty".into(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in &table.entries {
        if entry.organism.is_empty() || entry.antibiotic.is_empty() {
            return Err(AmrError::BreakpointInvalid(
                "organism and antibiotic must not be empty".into(),
            ));
        }

        if normalize_organism(&entry.organism) != entry.organism {
            return Err(AmrError::BreakpointInvalid(format!(
                "organism '{}' is not a canonical key (expected '{}')",
                entry.organism,
                normalize_organism(&entry.organism)
            )));
        }

        if normalize_antibiotic(&entry.antibiotic) != entry.antibiotic {
            return Err(AmrError::BreakpointInvalid(format!(
                "antibiotic '{}' is not a canonical key (expected '{}')",
                entry.antibiotic,
                normalize_antibiotic(&entry.antibiotic)
            )));
        }

        if entry.susceptible_max <= rust_decimal::Decimal::ZERO {
            return Err(AmrError::BreakpointInvalid(format!(
                "{}/{}: susceptible_max must be positive",
                entry.organism, entry.antibiotic
            )));
        }

        if entry.susceptible_max >= entry.resistant_min {
            return Err(AmrError::BreakpointInvalid(format!(
                "{}/{}: susceptible_max {} must be below resistant_min {}",
                entry.organism, entry.antibiotic, entry.susceptible_max, entry.resistant_min
            )));
        }

        if !seen.insert((entry.organism.as_str(), entry.antibiotic.as_str())) {
            return Err(AmrError::BreakpointInvalid(format!(
                "duplicate entry for {}/{}",
                entry.organism, entry.antibiotic
            )));
        }
    }

    Ok(())
}

/// Breakpoint tables keyed by a version id such as "eucast-14".
///
/// An analysis pins one id; re-running against another id re-interprets the
/// same isolates without touching them.
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    tables: BTreeMap<String, BreakpointTable>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every embedded preset.
    pub fn with_presets() -> Result<Self, AmrError> {
        let mut registry = Self::new();
        for id in builtin::PRESETS {
            registry.insert(id, builtin::load_preset(id)?)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, id: &str, table: BreakpointTable) -> Result<(), AmrError> {
        validate_table(&table)?;
        if self.tables.contains_key(id) {
            return Err(AmrError::BreakpointInvalid(format!(
                "a table with id '{id}' is already registered"
            )));
        }
        self.tables.insert(id.to_string(), table);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&BreakpointTable, AmrError> {
        self.tables.get(id).ok_or_else(|| {
            AmrError::BreakpointInvalid(format!(
                "unknown breakpoint version '{}'. Available: {}",
                id,
                self.ids().join(", ")
            ))
        })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }
}
