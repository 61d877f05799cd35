//! Render model for one progress frame

use crate::format::format_duration;
use crate::snapshot::{ProgressSnapshot, ProgressStatus};
use chrono::{DateTime, Utc};
use frameguard_core::TaskId;
use serde::Serialize;

/// Everything a surface needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressFrame {
    /// Task the frame belongs to
    pub task_id: TaskId,
    /// Status at snapshot time
    pub status: ProgressStatus,
    /// Progress bar fill in `[0, 1]`
    pub fraction: f64,
    /// `[status] last message`
    pub status_line: String,
    /// Current step, or the final verdict
    pub step_line: String,
    /// Elapsed and remaining (or total) time
    pub time_line: String,
}

impl ProgressFrame {
    /// Build the frame for `snapshot` as of `now`
    #[must_use]
    pub fn from_snapshot(snapshot: &ProgressSnapshot, now: DateTime<Utc>) -> Self {
        let elapsed = format_duration(snapshot.elapsed(now));

        let step_line = match snapshot.status {
            ProgressStatus::Failed => format!("analysis failed: {}", snapshot.last_message),
            ProgressStatus::Completed => "analysis complete: all steps finished".to_string(),
            ProgressStatus::Initializing | ProgressStatus::Running => format!(
                "step {} of {} ({:.1}%) | {} | {}",
                snapshot.current_step + 1,
                snapshot.total_steps,
                snapshot.progress_percentage,
                snapshot.current_step_name,
                snapshot.current_step_description
            ),
        };

        let time_line = match snapshot.status {
            ProgressStatus::Completed => format!("elapsed {elapsed} | total {elapsed}"),
            ProgressStatus::Failed => format!("elapsed {elapsed} | interrupted"),
            ProgressStatus::Initializing | ProgressStatus::Running => format!(
                "elapsed {elapsed} | remaining {}",
                format_duration(snapshot.remaining(now))
            ),
        };

        Self {
            task_id: snapshot.analysis_id.clone(),
            status: snapshot.status,
            fraction: snapshot.fraction(),
            status_line: format!("[{}] {}", snapshot.status, snapshot.last_message),
            step_line,
            time_line,
        }
    }

    /// Whole-number percentage for compact rendering
    #[inline]
    #[must_use]
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).round() as u8
    }
}
