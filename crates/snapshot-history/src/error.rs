use std::fmt;

/// Unified error type for the snapshot-history crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid input provided by the caller (blank text, bad storage key).
    InvalidInput(String),
    /// Storage or transport failure.
    Internal(String),
}

impl CoreError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::InvalidInput(_))
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
