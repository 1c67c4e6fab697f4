//! Common result and error types for the schematic engine.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value, which may be a degraded layout after
/// fallbacks (labels instead of wires, random fallback positions). `Err` means
/// an engine bug, not a problem with the user's netlist. Netlist problems are
/// reported through the diagnostic sink and the operation still returns `Ok`.
pub type AutoschResult<T> = Result<T, InternalError>;

/// An internal engine error indicating a bug, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal engine error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
