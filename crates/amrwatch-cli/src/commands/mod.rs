pub mod analyze;
pub mod breakpoints;
pub mod interpret;
pub mod rates;
pub mod report;
pub mod stewardship;

use amrwatch_core::breakpoints::schema::BreakpointTable;
use amrwatch_core::breakpoints::{load_table, BreakpointRegistry};
use amrwatch_core::error::AmrError;
use amrwatch_core::{load_config, AnalysisConfig};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::TableArgs;

/// Read and deserialize a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AmrError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Resolve configuration and the pinned breakpoint table. A custom table
/// file wins over `--standard`, which wins over the configured version.
pub fn load_context(args: &TableArgs) -> Result<(BreakpointTable, AnalysisConfig), AmrError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(standard) = &args.standard {
        config.standard_version = standard.clone();
    }

    let table = match &args.breakpoints {
        Some(path) => load_table(path)?,
        None => BreakpointRegistry::with_presets()?
            .get(&config.standard_version)?
            .clone(),
    };
    tracing::debug!(table = %table.label(), "breakpoint table pinned");
    Ok((table, config))
}

pub fn is_json(output_format: &str) -> bool {
    output_format.eq_ignore_ascii_case("json")
}
