use amrwatch_core::error::AmrError;
use amrwatch_core::interpret_isolates;
use amrwatch_core::model::Isolate;
use std::path::Path;

use crate::commands::{is_json, load_context, read_json};
use crate::output;
use crate::TableArgs;

pub fn run(
    input_file: &Path,
    table_args: &TableArgs,
    output_format: &str,
    reasons: bool,
) -> Result<(), AmrError> {
    let (table, _config) = load_context(table_args)?;
    let isolates: Vec<Isolate> = read_json(input_file)?;
    tracing::info!(isolates = isolates.len(), table = %table.label(), "interpreting");

    let result = interpret_isolates(&isolates, &table)?;

    if is_json(output_format) {
        output::json::print(&result)?;
    } else {
        output::table::print_interpretation(&result, reasons);
    }
    Ok(())
}
