use crate::model::{MeasuredValue, SusceptibilityCall};
use crate::trace::TraceBundle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The thresholds that produced a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBreakpoint {
    pub susceptible_max: Decimal,
    pub resistant_min: Decimal,
    pub unit: String,
}

/// Interpretation of a single antibiotic result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretedCall {
    /// Canonical antibiotic key.
    pub antibiotic: String,
    /// Antibiotic name as it appeared on the isolate.
    pub raw_name: String,
    pub value: MeasuredValue,
    pub call: SusceptibilityCall,
    /// Human-readable explanation of the call.
    pub reason: String,
    /// True if an off-scale value leaves the call open (worst case reported).
    pub uncertain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<AppliedBreakpoint>,
}

/// Interpretation of every result on one isolate against one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolateInterpretation {
    pub isolate_id: String,
    /// Canonical organism key.
    pub organism: String,
    /// Organism as recorded on the isolate.
    pub raw_organism: String,
    pub calls: Vec<InterpretedCall>,
    /// Antibiotics without a breakpoint for this organism.
    pub not_established: Vec<String>,
}

impl IsolateInterpretation {
    pub fn call_for(&self, antibiotic: &str) -> Option<&InterpretedCall> {
        self.calls.iter().find(|c| c.antibiotic == antibiotic)
    }
}

/// Interpretation of a batch of isolates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretationResult {
    /// "EUCAST 14.0"
    pub table: String,
    pub isolates: Vec<IsolateInterpretation>,
    pub trace: TraceBundle,
}
