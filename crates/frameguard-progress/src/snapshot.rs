//! Progress snapshots
//!
//! What the producing task publishes after each step. Missing fields fall
//! back to the values a freshly started analysis would report.

use chrono::{DateTime, Utc};
use frameguard_core::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an analysis as seen by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Accepted, no step started yet
    Initializing,
    /// Steps in progress
    #[default]
    Running,
    /// All steps done
    Completed,
    /// Aborted with an error
    Failed,
}

impl ProgressStatus {
    /// Completed or failed; no further updates will arrive
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

fn default_total_steps() -> u32 {
    8
}

/// Point-in-time progress of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Task identity the snapshot belongs to
    pub analysis_id: TaskId,
    /// Lifecycle status
    #[serde(default)]
    pub status: ProgressStatus,
    /// Zero-based index of the current step
    #[serde(default)]
    pub current_step: u32,
    /// Number of steps in the analysis
    #[serde(default = "default_total_steps")]
    pub total_steps: u32,
    /// Overall progress in `[0, 100]`
    #[serde(default)]
    pub progress_percentage: f64,
    /// Short name of the current step
    #[serde(default)]
    pub current_step_name: String,
    /// What the current step is doing
    #[serde(default)]
    pub current_step_description: String,
    /// Latest message from the producer
    #[serde(default)]
    pub last_message: String,
    /// When the analysis started, if known
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Elapsed seconds as last stored by the producer
    #[serde(default)]
    pub elapsed_time: f64,
    /// Producer's estimate of total seconds
    #[serde(default)]
    pub estimated_total_time: f64,
    /// Analysis depth tier, used to pick the refresh mode
    ///
    /// Read from the top level of the snapshot only; producers that keep
    /// the depth inside per-step data must copy it here. Absent means
    /// `Normal` mode.
    #[serde(default)]
    pub research_depth: Option<u32>,
}

impl ProgressSnapshot {
    /// Fresh running snapshot
    #[must_use]
    pub fn new(analysis_id: TaskId) -> Self {
        Self {
            analysis_id,
            status: ProgressStatus::Running,
            current_step: 0,
            total_steps: default_total_steps(),
            progress_percentage: 0.0,
            current_step_name: String::new(),
            current_step_description: String::new(),
            last_message: String::new(),
            start_time: None,
            elapsed_time: 0.0,
            estimated_total_time: 0.0,
            research_depth: None,
        }
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ProgressStatus) -> Self {
        self.status = status;
        self
    }

    /// With step position and name
    #[must_use]
    pub fn with_step(mut self, current: u32, total: u32, name: impl Into<String>) -> Self {
        self.current_step = current;
        self.total_steps = total;
        self.current_step_name = name.into();
        self
    }

    /// With percentage
    #[inline]
    #[must_use]
    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.progress_percentage = percentage;
        self
    }

    /// With message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.last_message = message.into();
        self
    }

    /// With research depth tier
    #[inline]
    #[must_use]
    pub fn with_research_depth(mut self, depth: u32) -> Self {
        self.research_depth = Some(depth);
        self
    }

    /// With timing information
    #[inline]
    #[must_use]
    pub fn with_timing(
        mut self,
        start_time: Option<DateTime<Utc>>,
        elapsed_time: f64,
        estimated_total_time: f64,
    ) -> Self {
        self.start_time = start_time;
        self.elapsed_time = elapsed_time;
        self.estimated_total_time = estimated_total_time;
        self
    }

    /// Elapsed seconds as of `now`
    ///
    /// Completed analyses report their stored final time; running ones are
    /// computed live from `start_time` when known.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> f64 {
        match (self.status, self.start_time) {
            (ProgressStatus::Completed, _) | (_, None) => self.elapsed_time,
            (_, Some(start)) => {
                let millis = (now - start).num_milliseconds().max(0);
                millis as f64 / 1000.0
            }
        }
    }

    /// Estimated seconds left as of `now`, never negative
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> f64 {
        (self.estimated_total_time - self.elapsed(now)).max(0.0)
    }

    /// Progress as a fraction in `[0, 1]`
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.progress_percentage.is_finite() {
            (self.progress_percentage / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn id() -> TaskId {
        TaskId::new("analysis-1").unwrap()
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let snap: ProgressSnapshot = serde_json::from_str(r#"{"analysis_id":"analysis-1"}"#).unwrap();
        assert_eq!(snap.status, ProgressStatus::Running);
        assert_eq!(snap.total_steps, 8);
        assert_eq!(snap.research_depth, None);
    }

    #[test]
    fn research_depth_read_from_top_level_only() {
        let nested: ProgressSnapshot = serde_json::from_str(
            r#"{"analysis_id":"analysis-1","steps":[{"research_depth":1}]}"#,
        )
        .unwrap();
        assert_eq!(nested.research_depth, None);

        let top: ProgressSnapshot =
            serde_json::from_str(r#"{"analysis_id":"analysis-1","research_depth":1}"#).unwrap();
        assert_eq!(top.research_depth, Some(1));
    }

    #[test]
    fn missing_id_is_rejected() {
        let res: Result<ProgressSnapshot, _> = serde_json::from_str(r#"{"status":"running"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn status_terminal() {
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Failed.is_terminal());
        assert!(!ProgressStatus::Running.is_terminal());
        assert!(!ProgressStatus::Initializing.is_terminal());
    }

    #[test]
    fn running_elapsed_is_live() {
        let now = Utc::now();
        let snap = ProgressSnapshot::new(id()).with_timing(Some(now - Duration::seconds(90)), 10.0, 120.0);
        assert!((snap.elapsed(now) - 90.0).abs() < 1e-9);
        assert!((snap.remaining(now) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn completed_elapsed_is_stored() {
        let now = Utc::now();
        let snap = ProgressSnapshot::new(id())
            .with_status(ProgressStatus::Completed)
            .with_timing(Some(now - Duration::seconds(500)), 245.5, 200.0);
        assert!((snap.elapsed(now) - 245.5).abs() < 1e-9);
        assert_eq!(snap.remaining(now), 0.0);
    }

    #[test]
    fn unknown_start_falls_back_to_stored() {
        let snap = ProgressSnapshot::new(id()).with_timing(None, 12.0, 60.0);
        assert!((snap.elapsed(Utc::now()) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn future_start_clamps_to_zero() {
        let now = Utc::now();
        let snap = ProgressSnapshot::new(id()).with_timing(Some(now + Duration::seconds(5)), 0.0, 10.0);
        assert_eq!(snap.elapsed(now), 0.0);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(ProgressSnapshot::new(id()).with_percentage(150.0).fraction(), 1.0);
        assert_eq!(ProgressSnapshot::new(id()).with_percentage(-3.0).fraction(), 0.0);
        assert_eq!(ProgressSnapshot::new(id()).with_percentage(f64::NAN).fraction(), 0.0);
        assert!((ProgressSnapshot::new(id()).with_percentage(37.5).fraction() - 0.375).abs() < 1e-9);
    }
}
