pub mod engine;
pub mod outcome;

pub use engine::{interpret, interpret_isolate, interpret_value};
pub use outcome::{AppliedBreakpoint, InterpretationResult, InterpretedCall, IsolateInterpretation};
