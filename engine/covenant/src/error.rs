use thiserror::Error;

/// Result alias used across the crate.
pub type CovenantResult<T> = Result<T, CovenantError>;

/// Fatal failures raised by runtime primitives.
///
/// Recoverable outcomes (cast misses, merge conflicts, out-of-range `nth`)
/// are ordinary values and never surface through this type.
#[derive(Debug, Error)]
pub enum CovenantError {
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("calendar error: {0}")]
    Calendar(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("json error: {0}")]
    Json(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Logic(String),
}

impl CovenantError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        CovenantError::Type(message.into())
    }

    /// True for the representation channel: malformed programs or corrupted
    /// values, as opposed to configuration, calendar or logic failures.
    pub fn is_type_error(&self) -> bool {
        matches!(self, CovenantError::Type(_) | CovenantError::DivisionByZero)
    }
}
