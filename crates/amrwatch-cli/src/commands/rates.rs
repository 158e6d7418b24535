use amrwatch_core::error::AmrError;
use amrwatch_core::model::{Granularity, Isolate};
use amrwatch_core::{priority_threats, SurveillanceEngine};
use serde_json::json;
use std::path::Path;

use crate::commands::{is_json, load_context, read_json};
use crate::output;
use crate::TableArgs;

fn parse_granularity(s: &str) -> Result<Granularity, AmrError> {
    match s.to_ascii_lowercase().as_str() {
        "year" | "yearly" => Ok(Granularity::Year),
        "quarter" | "quarterly" => Ok(Granularity::Quarter),
        "month" | "monthly" => Ok(Granularity::Month),
        other => Err(AmrError::Validation(format!(
            "unknown granularity '{other}'. Use year, quarter or month"
        ))),
    }
}

pub fn run(
    input_file: &Path,
    table_args: &TableArgs,
    granularity: &str,
    priority: Option<f64>,
    min_points: usize,
    output_format: &str,
) -> Result<(), AmrError> {
    let granularity = parse_granularity(granularity)?;
    let (table, config) = load_context(table_args)?;
    let isolates: Vec<Isolate> = read_json(input_file)?;

    let engine = SurveillanceEngine::new(table, config)?;
    let rates = engine.rate_table(&isolates, granularity)?;
    let threats = priority.map(|pct| (pct, priority_threats(&rates.rows, pct, min_points)));

    if is_json(output_format) {
        match &threats {
            Some((_, list)) => output::json::print(&json!({ "rates": rates, "priority_threats": list }))?,
            None => output::json::print(&rates)?,
        }
    } else {
        output::table::print_rate_table(&rates);
        if let Some((pct, list)) = &threats {
            output::table::print_threats(list, *pct);
        }
    }
    Ok(())
}
