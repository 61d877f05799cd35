//! Testing utilities for frameguard workspace
//!
//! Shared clocks, surfaces, and snapshot fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use frameguard_core::{Clock, IntervalPolicy, RefreshGuard, TaskId};
use frameguard_progress::{
    DisplaySurface, ProgressFrame, ProgressSnapshot, ProgressStatus, SurfaceError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Clock that follows tokio's (possibly paused) timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

pub fn task(id: &str) -> TaskId {
    TaskId::new(id).unwrap()
}

pub fn policy_secs(normal: u64, fast: u64) -> IntervalPolicy {
    IntervalPolicy::new(Duration::from_secs(normal), Duration::from_secs(fast))
}

/// Shared guard driven by tokio time
pub fn tokio_guard(policy: IntervalPolicy) -> Arc<RefreshGuard> {
    Arc::new(RefreshGuard::with_clock(policy, TokioClock))
}

pub fn running_snapshot(id: &str, percentage: f64) -> ProgressSnapshot {
    ProgressSnapshot::new(task(id))
        .with_step(1, 8, "market analyst")
        .with_percentage(percentage)
        .with_message("working")
        .with_timing(None, 10.0, 120.0)
}

pub fn quick_snapshot(id: &str, percentage: f64) -> ProgressSnapshot {
    running_snapshot(id, percentage).with_research_depth(1)
}

pub fn completed_snapshot(id: &str) -> ProgressSnapshot {
    ProgressSnapshot::new(task(id))
        .with_status(ProgressStatus::Completed)
        .with_percentage(100.0)
        .with_message("done")
        .with_timing(None, 95.0, 95.0)
}

pub fn failed_snapshot(id: &str, message: &str) -> ProgressSnapshot {
    ProgressSnapshot::new(task(id))
        .with_status(ProgressStatus::Failed)
        .with_message(message)
        .with_timing(None, 12.0, 120.0)
}

/// What a surface was asked to show
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Frame(ProgressFrame),
    Unavailable(TaskId),
    TimedOut(TaskId, Duration),
}

/// Surface that records every successful call
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    events: Arc<Mutex<Vec<SurfaceEvent>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().clone()
    }

    pub fn frames(&self) -> Vec<ProgressFrame> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Frame(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl DisplaySurface for RecordingSurface {
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError> {
        self.push(SurfaceEvent::Frame(frame.clone()));
        Ok(())
    }

    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError> {
        self.push(SurfaceEvent::Unavailable(task_id.clone()));
        Ok(())
    }

    async fn show_timed_out(&self, task_id: &TaskId, after: Duration) -> Result<(), SurfaceError> {
        self.push(SurfaceEvent::TimedOut(task_id.clone(), after));
        Ok(())
    }
}

/// How a [`FlakySurface`] misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Detach,
    Panic,
}

/// Surface that fails its first `n` calls, then records like [`RecordingSurface`]
#[derive(Debug, Clone)]
pub struct FlakySurface {
    fault: Fault,
    remaining: Arc<AtomicUsize>,
    inner: RecordingSurface,
}

impl FlakySurface {
    pub fn detaching(n: usize) -> Self {
        Self::new(Fault::Detach, n)
    }

    pub fn panicking(n: usize) -> Self {
        Self::new(Fault::Panic, n)
    }

    pub fn always_detached() -> Self {
        Self::detaching(usize::MAX)
    }

    pub fn recorded(&self) -> &RecordingSurface {
        &self.inner
    }

    fn new(fault: Fault, n: usize) -> Self {
        Self {
            fault,
            remaining: Arc::new(AtomicUsize::new(n)),
            inner: RecordingSurface::new(),
        }
    }

    fn check(&self) -> Result<(), SurfaceError> {
        let failing = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !failing {
            return Ok(());
        }
        match self.fault {
            Fault::Detach => Err(SurfaceError::Detached("progress container".to_string())),
            Fault::Panic => panic!("removeChild: node is not a child of this node"),
        }
    }
}

#[async_trait]
impl DisplaySurface for FlakySurface {
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError> {
        self.check()?;
        self.inner.render(frame).await
    }

    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError> {
        self.check()?;
        self.inner.show_unavailable(task_id).await
    }

    async fn show_timed_out(&self, task_id: &TaskId, after: Duration) -> Result<(), SurfaceError> {
        self.check()?;
        self.inner.show_timed_out(task_id, after).await
    }
}

/// Surface whose `render` parks until released
///
/// Lets a test hold a mutation in flight and observe contention.
#[derive(Debug, Clone, Default)]
pub struct GatedSurface {
    entered: Arc<Notify>,
    gate: Arc<Notify>,
    inner: RecordingSurface,
}

impl GatedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a render is parked at the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked render finish
    pub fn open(&self) {
        self.gate.notify_one();
    }

    pub fn recorded(&self) -> &RecordingSurface {
        &self.inner
    }
}

#[async_trait]
impl DisplaySurface for GatedSurface {
    async fn render(&self, frame: &ProgressFrame) -> Result<(), SurfaceError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.render(frame).await
    }

    async fn show_unavailable(&self, task_id: &TaskId) -> Result<(), SurfaceError> {
        self.inner.show_unavailable(task_id).await
    }
}
