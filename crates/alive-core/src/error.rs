//! Core error types for alive-core.
//!
//! The taxonomy mirrors what the service surface reports to callers:
//! caller mistakes (`InvalidArgument`), missing entities (`NotFound`),
//! constraint collisions (`Conflict`), degraded generation
//! (`UpstreamUnavailable`), and broken storage invariants (`Internal`).

use thiserror::Error;

/// Core error type for alive-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range input. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A constraint was violated, e.g. an already-set transaction hash.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The reflection/report generator failed or timed out.
    ///
    /// A check-in never surfaces this: the pipeline recovers with fixed
    /// fallback content and only logs the failure.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A storage invariant was broken unexpectedly. Fatal for the operation.
    #[error("internal: {0}")]
    Internal(String),

    /// Underlying SQLite errors.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO errors (data directory, config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Stable wire code for the error, as reported to external callers.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            CoreError::Internal(_)
            | CoreError::Database(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => "INTERNAL",
        }
    }
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(
            CoreError::InvalidArgument("x".into()).code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(CoreError::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(CoreError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(CoreError::Internal("x".into()).code(), "INTERNAL");
    }
}
