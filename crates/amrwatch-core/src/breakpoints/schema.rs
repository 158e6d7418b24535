use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A versioned breakpoint table from one standard (e.g., EUCAST 14.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointTable {
    pub name: String,
    /// Issuing standard, e.g. "EUCAST" or "CLSI".
    pub standard: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default unit for entries without their own.
    #[serde(default = "default_unit")]
    pub unit: String,
    pub entries: Vec<BreakpointEntry>,
}

fn default_unit() -> String {
    "mg/L".to_string()
}

/// Thresholds for a single organism/antibiotic pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointEntry {
    /// Canonical organism key (see `parsing::normalize_organism`).
    pub organism: String,
    /// Canonical antibiotic key (see `parsing::normalize_antibiotic`).
    pub antibiotic: String,
    /// Values at or below this are Susceptible.
    pub susceptible_max: Decimal,
    /// Values at or above this are Resistant.
    pub resistant_min: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl BreakpointTable {
    /// Look up the entry for a canonical (organism, antibiotic) pair.
    pub fn lookup(&self, organism: &str, antibiotic: &str) -> Option<&BreakpointEntry> {
        self.entries
            .iter()
            .find(|e| e.organism == organism && e.antibiotic == antibiotic)
    }

    /// "EUCAST 14.0"
    pub fn label(&self) -> String {
        format!("{} {}", self.standard, self.version)
    }

    pub fn unit_for<'a>(&'a self, entry: &'a BreakpointEntry) -> &'a str {
        entry.unit.as_deref().unwrap_or(&self.unit)
    }
}
