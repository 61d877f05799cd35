//! Guarded progress display
//!
//! Polls one task's progress and renders it through a shared
//! `RefreshGuard`. The producer never waits on the display: a frame that
//! cannot be drawn right now is simply dropped.

use crate::frame::ProgressFrame;
use crate::snapshot::ProgressStatus;
use crate::source::ProgressSource;
use crate::surface::DisplaySurface;
use chrono::Utc;
use frameguard_core::{
    DisplaySettings, GuardConfig, RefreshGuard, RefreshMode, TaskId, TierMapping, UpdateOutcome,
};
use std::sync::Arc;
use tokio::time::Instant;

/// Result of one `update_display` pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// Keep polling
    Continue,
    /// Terminal status reached and its frame was attempted
    Finished(ProgressStatus),
    /// Source has no progress for the task
    Unavailable,
}

/// Why `auto_refresh` stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEnd {
    /// Analysis finished with the given terminal status
    Finished(ProgressStatus),
    /// Source had no progress for the task
    Unavailable,
    /// `max_duration` elapsed first
    TimedOut,
}

/// Live progress display for one task
pub struct ProgressDisplay<S, D> {
    task_id: TaskId,
    guard: Arc<RefreshGuard>,
    source: S,
    surface: D,
    tiers: TierMapping,
    settings: DisplaySettings,
    mode: RefreshMode,
    last_outcome: Option<UpdateOutcome>,
}

impl<S, D> ProgressDisplay<S, D>
where
    S: ProgressSource,
    D: DisplaySurface,
{
    /// Create display for `task_id`
    #[must_use]
    pub fn new(
        task_id: TaskId,
        guard: Arc<RefreshGuard>,
        source: S,
        surface: D,
        config: &GuardConfig,
    ) -> Self {
        Self {
            task_id,
            guard,
            source,
            surface,
            tiers: config.tiers,
            settings: config.display,
            mode: RefreshMode::Normal,
            last_outcome: None,
        }
    }

    /// Task being displayed
    #[inline]
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Mode resolved from the latest snapshot
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RefreshMode {
        self.mode
    }

    /// Outcome of the latest guarded mutation
    #[inline]
    #[must_use]
    pub fn last_outcome(&self) -> Option<&UpdateOutcome> {
        self.last_outcome.as_ref()
    }

    /// Surface being drawn on
    #[inline]
    pub fn surface(&self) -> &D {
        &self.surface
    }

    /// Poll the source once and attempt to draw
    pub async fn update_display(&mut self) -> DisplayState {
        let snapshot = match self.source.fetch(&self.task_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(task_id = %self.task_id, error = %err, "progress fetch failed; retrying next tick");
                return DisplayState::Continue;
            }
        };

        let Some(snapshot) = snapshot else {
            let (surface, task_id) = (&self.surface, &self.task_id);
            let outcome = self
                .guard
                .try_update_async(task_id, self.mode, || surface.show_unavailable(task_id))
                .await;
            self.last_outcome = Some(outcome);
            return DisplayState::Unavailable;
        };

        self.mode = self.tiers.mode_for(snapshot.research_depth);
        let frame = ProgressFrame::from_snapshot(&snapshot, Utc::now());
        let surface = &self.surface;
        let outcome = self
            .guard
            .try_update_async(&self.task_id, self.mode, || surface.render(&frame))
            .await;

        let attempted = outcome.was_attempted();
        self.last_outcome = Some(outcome);

        if snapshot.status.is_terminal() {
            if attempted {
                return DisplayState::Finished(snapshot.status);
            }
            tracing::debug!(task_id = %self.task_id, status = %snapshot.status, "final frame deferred");
        }
        DisplayState::Continue
    }

    /// Explicit user refresh: bypass the throttle once, then draw
    ///
    /// A mutation already in flight still wins; the refresh is then skipped.
    pub async fn refresh_now(&mut self) -> DisplayState {
        self.guard.reset_throttle(&self.task_id);
        self.update_display().await
    }

    /// Poll and draw until the analysis finishes or `max_duration` passes
    ///
    /// Releases the task's guard state on exit.
    pub async fn auto_refresh(&mut self) -> RefreshEnd {
        let started = Instant::now();
        let max_duration = self.settings.max_duration();

        tracing::info!(task_id = %self.task_id, max_secs = max_duration.as_secs(), "auto refresh started");

        let end = loop {
            if started.elapsed() > max_duration {
                tracing::warn!(task_id = %self.task_id, "auto refresh timed out");
                self.guard.reset_throttle(&self.task_id);
                let (surface, task_id) = (&self.surface, &self.task_id);
                let outcome = self
                    .guard
                    .try_update_async(task_id, self.mode, || surface.show_timed_out(task_id, max_duration))
                    .await;
                self.last_outcome = Some(outcome);
                break RefreshEnd::TimedOut;
            }

            match self.update_display().await {
                DisplayState::Continue => {}
                DisplayState::Finished(status) => break RefreshEnd::Finished(status),
                DisplayState::Unavailable => break RefreshEnd::Unavailable,
            }

            tokio::time::sleep(self.settings.poll_interval_for(self.mode)).await;
        };

        self.guard.release(&self.task_id);
        tracing::info!(task_id = %self.task_id, end = ?end, "auto refresh finished");
        end
    }
}

impl<S, D> std::fmt::Debug for ProgressDisplay<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressDisplay")
            .field("task_id", &self.task_id)
            .field("mode", &self.mode)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::snapshot::ProgressSnapshot;
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        frames: AtomicUsize,
        unavailable: AtomicUsize,
    }

    #[async_trait]
    impl DisplaySurface for Counting {
        async fn render(&self, _frame: &ProgressFrame) -> Result<(), SurfaceError> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn show_unavailable(&self, _task_id: &TaskId) -> Result<(), SurfaceError> {
            self.unavailable.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn display(source: &MemorySource) -> ProgressDisplay<MemorySource, Counting> {
        ProgressDisplay::new(
            TaskId::new("d1").unwrap(),
            Arc::new(RefreshGuard::default()),
            source.clone(),
            Counting::default(),
            &GuardConfig::default(),
        )
    }

    #[tokio::test]
    async fn running_continues_and_throttles() {
        let source = MemorySource::new();
        source.publish(ProgressSnapshot::new(TaskId::new("d1").unwrap()).with_percentage(20.0));
        let mut display = display(&source);

        assert_eq!(display.update_display().await, DisplayState::Continue);
        assert_eq!(display.update_display().await, DisplayState::Continue);
        assert_eq!(display.surface().frames.load(Ordering::SeqCst), 1);
        assert_eq!(
            display.last_outcome().and_then(UpdateOutcome::skip_reason),
            Some(frameguard_core::SkipReason::Throttled)
        );
    }

    #[tokio::test]
    async fn completed_finishes() {
        let source = MemorySource::new();
        source.publish(
            ProgressSnapshot::new(TaskId::new("d1").unwrap()).with_status(ProgressStatus::Completed),
        );
        let mut display = display(&source);
        assert_eq!(
            display.update_display().await,
            DisplayState::Finished(ProgressStatus::Completed)
        );
    }

    #[tokio::test]
    async fn no_data_is_unavailable() {
        let mut display = display(&MemorySource::new());
        assert_eq!(display.update_display().await, DisplayState::Unavailable);
        assert_eq!(display.surface().unavailable.load(Ordering::SeqCst), 1);
        assert_eq!(display.surface().frames.load(Ordering::SeqCst), 0);
    }
}
