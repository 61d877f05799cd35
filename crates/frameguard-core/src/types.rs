//! Core types for the refresh guard
//!
//! - Task identity (the throttling key)
//! - Refresh modes (interval policy selector)
//! - Outcomes of an update attempt

use crate::error::{GuardError, MutationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Opaque identity of one in-flight progress stream
///
/// Guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Create from an existing identifier
    ///
    /// # Errors
    /// - `GuardError::EmptyTaskId` if `id` is empty
    pub fn new(id: impl Into<String>) -> Result<Self, GuardError> {
        let id = id.into();
        if id.is_empty() {
            return Err(GuardError::EmptyTaskId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh identity (ULID for sortability)
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// `<prefix>-<index>`; non-empty by construction
    pub(crate) fn indexed(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}-{index}"))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = GuardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interval policy selector
///
/// `Fast` maps to the *longer* interval: fast-completing producers emit
/// update bursts the display cannot absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Steady-paced updates
    #[default]
    Normal,
    /// High completion velocity
    Fast,
}

impl RefreshMode {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            other => Err(GuardError::Config(format!("unknown refresh mode: {other}"))),
        }
    }
}

/// Why an attempt was dropped without touching the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// Another mutation for the same task is in flight
    Busy,
    /// Minimum interval has not elapsed
    Throttled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("busy"),
            Self::Throttled => f.write_str("throttled"),
        }
    }
}

/// Result of `RefreshGuard::try_update`
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Mutation ran and succeeded
    Applied,
    /// Attempt dropped before the mutation ran
    Skipped(SkipReason),
    /// Mutation ran and failed; the failure was logged and swallowed
    Recovered(MutationError),
}

impl UpdateOutcome {
    /// Mutation ran and succeeded
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Mutation callback was invoked (successfully or not)
    #[inline]
    #[must_use]
    pub fn was_attempted(&self) -> bool {
        matches!(self, Self::Applied | Self::Recovered(_))
    }

    /// Skip reason, if the attempt was dropped
    #[inline]
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Recovered mutation error, if any
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&MutationError> {
        match self {
            Self::Recovered(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_rejects_empty() {
        assert!(matches!(TaskId::new(""), Err(GuardError::EmptyTaskId)));
        assert!("".parse::<TaskId>().is_err());
    }

    #[test]
    fn task_id_round_trips_through_display() {
        let id = TaskId::new("analysis_123").unwrap();
        assert_eq!(id.to_string(), "analysis_123");
        assert_eq!(id.as_str(), "analysis_123");
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn task_id_deserialize_rejects_empty() {
        let ok: Result<TaskId, _> = serde_json::from_str("\"abc\"");
        assert!(ok.is_ok());
        let empty: Result<TaskId, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn refresh_mode_parse() {
        assert_eq!("fast".parse::<RefreshMode>().unwrap(), RefreshMode::Fast);
        assert_eq!("Normal".parse::<RefreshMode>().unwrap(), RefreshMode::Normal);
        assert!("turbo".parse::<RefreshMode>().is_err());
        assert_eq!(RefreshMode::default(), RefreshMode::Normal);
    }

    #[test]
    fn outcome_helpers() {
        assert!(UpdateOutcome::Applied.is_applied());
        assert!(UpdateOutcome::Applied.was_attempted());

        let skipped = UpdateOutcome::Skipped(SkipReason::Busy);
        assert_eq!(skipped.skip_reason(), Some(SkipReason::Busy));
        assert!(!skipped.was_attempted());

        let recovered = UpdateOutcome::Recovered(MutationError::Panicked("x".into()));
        assert!(recovered.was_attempted());
        assert!(recovered.error().is_some());
        assert!(!recovered.is_applied());
    }
}
