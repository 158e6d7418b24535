pub mod breakpoints;
pub mod cluster;
pub mod config;
pub mod error;
pub mod interpret;
pub mod model;
pub mod parsing;
pub mod report;
pub mod risk;
pub mod stats;
pub mod stewardship;
pub mod trace;

use breakpoints::schema::BreakpointTable;
use interpret::{interpret_isolate, InterpretationResult};
use model::Isolate;
use rayon::prelude::*;
use trace::{build_entry_trace, TraceBundle, TraceSeverity, TraceVisibility, TraceWarning};

pub use config::{load_config, AnalysisConfig};
pub use error::AmrError;
pub use report::{build_report, priority_threats, SurveillanceEngine, SurveillanceReport};

/// Main API entry point: interpret a batch of isolates against one pinned
/// breakpoint table.
///
/// Isolates are never modified, so the same batch can be re-interpreted
/// against another table version. Every call is recorded in the trace.
/// Fails when one isolate reports conflicting calls for the same antibiotic.
pub fn interpret_isolates(
    isolates: &[Isolate],
    table: &BreakpointTable,
) -> Result<InterpretationResult, AmrError> {
    let label = table.label();
    let interpreted: Vec<_> = isolates
        .par_iter()
        .map(|iso| interpret_isolate(iso, table))
        .collect::<Result<_, _>>()?;

    let mut trace = TraceBundle::default();
    for interp in &interpreted {
        for (idx, call) in interp.calls.iter().enumerate() {
            trace
                .entries
                .push(build_entry_trace(interp, idx, call, &label));
        }
        if !interp.not_established.is_empty() {
            trace.warnings.push(TraceWarning {
                key: Some(interp.isolate_id.clone()),
                message: format!(
                    "no {} breakpoint for {}: {}",
                    label,
                    interp.organism,
                    interp.not_established.join(", ")
                ),
                severity: TraceSeverity::Info,
                visibility: TraceVisibility::Auto,
            });
        }
    }

    Ok(InterpretationResult {
        table: label,
        isolates: interpreted,
        trace,
    })
}
