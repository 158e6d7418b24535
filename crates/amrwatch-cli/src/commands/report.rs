use amrwatch_core::cluster::DistanceSource;
use amrwatch_core::error::AmrError;
use amrwatch_core::model::{Isolate, Period};
use amrwatch_core::SurveillanceEngine;
use chrono::NaiveDate;
use std::path::Path;

use crate::commands::{is_json, load_context, read_json};
use crate::output;
use crate::TableArgs;

pub fn run(
    input_file: &Path,
    table_args: &TableArgs,
    from: NaiveDate,
    to: NaiveDate,
    distances: Option<&Path>,
    output_format: &str,
) -> Result<(), AmrError> {
    let window = Period::new(from, to)?;
    let (table, config) = load_context(table_args)?;
    let isolates: Vec<Isolate> = read_json(input_file)?;

    let matrix = match distances {
        Some(path) => Some(read_json::<DistanceSource>(path)?.into_matrix()?),
        None => None,
    };

    let engine = SurveillanceEngine::new(table, config)?;
    let out = engine.run(&isolates, window, matrix.as_ref())?;

    if is_json(output_format) {
        output::json::print(&out)?;
    } else {
        output::table::print_run(&out);
    }
    Ok(())
}
