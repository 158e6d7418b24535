use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AmrError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("undefined result: {0}")]
    Undefined(String),

    #[error("insufficient data: need at least {needed} points, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("inconsistent aggregation: {component} is keyed '{found}' but the report is keyed '{expected}'")]
    InconsistentAggregation {
        component: String,
        expected: String,
        found: String,
    },

    #[error("failed to parse value: {0}")]
    ParseError(String),

    #[error("failed to load breakpoint table from {path}: {reason}")]
    BreakpointLoad { path: PathBuf, reason: String },

    #[error("invalid breakpoint table: {0}")]
    BreakpointInvalid(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
