//! Error types for meter operations

use thiserror::Error;

/// Result type alias using MeterError
pub type Result<T> = std::result::Result<T, MeterError>;

/// Caller-contract violations a meter can report.
///
/// A failing call never mutates the meter, so the committed values are
/// exactly what they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeterError {
    /// A required input value was absent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A snapshot field was missing or could not be parsed
    #[error("Corrupt state in field '{field}': {reason}")]
    CorruptState { field: String, reason: String },
}

impl MeterError {
    pub(crate) fn corrupt(field: &str, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
