//! Error types for frameguard Core
//!
//! Two families:
//! - `MutationError`: a display mutation went wrong. Carried inside
//!   `UpdateOutcome::Recovered`, never returned as `Err`.
//! - `GuardError`: construction and configuration failures.

use std::any::Any;

/// Boxed error accepted from mutation callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single display mutation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The callback returned an error (e.g. the target element was detached)
    #[error("mutation failed: {0}")]
    Failed(#[source] BoxError),

    /// The callback panicked
    #[error("mutation panicked: {0}")]
    Panicked(String),
}

impl MutationError {
    /// Wrap a callback error
    #[inline]
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    /// Build from a caught panic payload
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Check if the callback panicked
    #[inline]
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Guard construction / configuration errors
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Task identities must be non-empty
    #[error("task id must not be empty")]
    EmptyTaskId,

    /// Configuration could not be parsed or serialized
    #[error("configuration error: {0}")]
    Config(String),

    /// Interval policy is unusable
    #[error("invalid interval policy: {0}")]
    InvalidPolicy(String),

    /// Reading configuration failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
