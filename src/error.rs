//! Error types for the expiration scheduler
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cleaner Error Enum ==
/// Unified error type for the expiration scheduler.
///
/// Normal operation never surfaces errors to callers; a canceled wait is
/// plain control flow (see [`crate::tasks::WaitOutcome`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleanerError {
    /// Scheduling needs a Tokio runtime to spawn timers on
    #[error("No Tokio runtime available to drive expiration timers")]
    NoRuntime,

    /// The expiration timestamp of a value could not be read
    #[error("Invalid expiration field '{field}': {reason}")]
    InvalidExpiry { field: String, reason: String },
}

impl CleanerError {
    /// Shorthand for an [`CleanerError::InvalidExpiry`] error.
    pub fn invalid_expiry(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpiry {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the expiration scheduler.
pub type Result<T> = std::result::Result<T, CleanerError>;
