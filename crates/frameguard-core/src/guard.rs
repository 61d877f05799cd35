//! Refresh guard
//!
//! Serializes and throttles display mutations per task identity:
//! - Admission is non-blocking: contention resolves to `Skipped(Busy)`
//! - Attempts closer than the mode's interval resolve to `Skipped(Throttled)`
//! - Mutation failures (errors or panics) resolve to `Recovered`
//!
//! Slot locks are held only for admission and bookkeeping, never while the
//! mutation callback runs. A callback may therefore call back into the
//! guard for the same task; it observes `Busy`.

use crate::clock::{Clock, SystemClock};
use crate::config::GuardConfig;
use crate::error::{BoxError, MutationError};
use crate::policy::IntervalPolicy;
use crate::types::{RefreshMode, SkipReason, TaskId, UpdateOutcome};
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-task bookkeeping
#[derive(Debug, Default)]
struct SlotState {
    last_update: Option<Instant>,
    in_progress: bool,
    /// Released; leaves the map once no mutation is in flight
    retired: bool,
    applied: u64,
    recovered: u64,
    last_failure: Option<String>,
}

#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
}

/// Admitted mutation; clears the busy flag when dropped
///
/// Also finishes a deferred `release`: a retired slot is removed from the
/// map here, under its own lock, and only if the map still points at it.
struct InFlight<'a> {
    slots: &'a DashMap<TaskId, Arc<Slot>>,
    task_id: &'a TaskId,
    slot: Arc<Slot>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        state.in_progress = false;
        if state.retired {
            self.slots
                .remove_if(self.task_id, |_, slot| Arc::ptr_eq(slot, &self.slot));
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    busy: AtomicU64,
    throttled: AtomicU64,
    recovered: AtomicU64,
}

/// Snapshot of one task's guard state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDiagnostics {
    /// Mutation currently running
    pub in_progress: bool,
    /// Successful mutations
    pub applied: u64,
    /// Failed (recovered) mutations
    pub recovered: u64,
    /// Message of the most recent failure
    pub last_failure: Option<String>,
    /// Time since the last admitted mutation
    pub since_last_update: Option<Duration>,
}

/// Guard-wide outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuardStats {
    /// Mutations applied
    pub applied: u64,
    /// Attempts dropped as busy
    pub skipped_busy: u64,
    /// Attempts dropped as throttled
    pub skipped_throttled: u64,
    /// Mutations that failed and were swallowed
    pub recovered: u64,
    /// Tasks with live bookkeeping
    pub tracked_tasks: usize,
}

impl GuardStats {
    /// Total attempts seen
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.applied + self.skipped_busy + self.skipped_throttled + self.recovered
    }
}

/// Per-task mutual exclusion and rate limiting for display mutations
///
/// # Guarantees
/// - Never two in-flight mutations for the same `TaskId`
/// - At most one admitted mutation per `min_interval` per `TaskId`
/// - `try_update` never blocks on another caller and never propagates a
///   mutation failure
///
/// Distinct task identities are fully independent.
#[derive(Debug)]
pub struct RefreshGuard {
    policy: IntervalPolicy,
    clock: Arc<dyn Clock>,
    slots: DashMap<TaskId, Arc<Slot>>,
    counters: Counters,
}

impl RefreshGuard {
    /// Create guard on the system clock
    #[inline]
    #[must_use]
    pub fn new(policy: IntervalPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }

    /// Create guard on a custom clock
    #[must_use]
    pub fn with_clock(policy: IntervalPolicy, clock: impl Clock + 'static) -> Self {
        Self {
            policy,
            clock: Arc::new(clock),
            slots: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Create guard from configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.intervals)
    }

    /// Interval policy in effect
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &IntervalPolicy {
        &self.policy
    }

    /// Attempt a display mutation for `task_id`
    ///
    /// Runs `mutation` only if no other mutation for `task_id` is in flight and
    /// the mode's interval has elapsed since the last admitted attempt.
    /// Errors and panics from `mutation` are logged at `warn` and returned as
    /// `UpdateOutcome::Recovered`.
    pub fn try_update<F, E>(&self, task_id: &TaskId, mode: RefreshMode, mutation: F) -> UpdateOutcome
    where
        F: FnOnce() -> Result<(), E>,
        E: Into<BoxError>,
    {
        let in_flight = match self.admit(task_id, mode) {
            Ok(in_flight) => in_flight,
            Err(reason) => return UpdateOutcome::Skipped(reason),
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(mutation)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(MutationError::failed(err)),
            Err(payload) => Err(MutationError::from_panic(payload)),
        };

        self.settle(task_id, in_flight, result)
    }

    /// Async variant of [`RefreshGuard::try_update`]
    ///
    /// For cooperative schedulers where attempts interleave at `.await`
    /// points. Admission is identical; the task stays busy until the
    /// mutation future resolves.
    pub async fn try_update_async<F, Fut, E>(
        &self,
        task_id: &TaskId,
        mode: RefreshMode,
        mutation: F,
    ) -> UpdateOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Into<BoxError>,
    {
        let in_flight = match self.admit(task_id, mode) {
            Ok(in_flight) => in_flight,
            Err(reason) => return UpdateOutcome::Skipped(reason),
        };

        let result = match AssertUnwindSafe(async move { mutation().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(MutationError::failed(err)),
            Err(payload) => Err(MutationError::from_panic(payload)),
        };

        self.settle(task_id, in_flight, result)
    }

    /// Discard all state for `task_id`
    ///
    /// Unknown ids are a no-op. An in-flight mutation is not interrupted:
    /// its throttle stamp and counters are cleared at once, but the task
    /// stays busy until the mutation settles, then its slot is dropped.
    /// Returns whether live state existed.
    pub fn release(&self, task_id: &TaskId) -> bool {
        let Some(slot) = self.slot(task_id) else {
            return false;
        };

        let mut state = slot.state.lock();
        if state.retired {
            return false;
        }

        if state.in_progress {
            *state = SlotState {
                in_progress: true,
                retired: true,
                ..SlotState::default()
            };
            tracing::debug!(task_id = %task_id, "release deferred until in-flight mutation settles");
        } else {
            state.retired = true;
            self.slots
                .remove_if(task_id, |_, current| Arc::ptr_eq(current, &slot));
            tracing::debug!(task_id = %task_id, "released refresh guard state");
        }
        true
    }

    /// Forget the last update time so the next attempt is not throttled
    ///
    /// Used for explicit user-requested refreshes. Busy state is untouched.
    pub fn reset_throttle(&self, task_id: &TaskId) {
        if let Some(slot) = self.slot(task_id) {
            slot.state.lock().last_update = None;
            tracing::debug!(task_id = %task_id, "throttle reset");
        }
    }

    /// Check if a mutation for `task_id` is running
    #[must_use]
    pub fn is_busy(&self, task_id: &TaskId) -> bool {
        self.slot(task_id).is_some_and(|slot| {
            let state = slot.state.lock();
            state.in_progress
        })
    }

    /// Number of tasks with live bookkeeping
    #[inline]
    #[must_use]
    pub fn tracked_tasks(&self) -> usize {
        self.slots.len()
    }

    /// Diagnostics for one task
    #[must_use]
    pub fn diagnostics(&self, task_id: &TaskId) -> Option<SlotDiagnostics> {
        let slot = self.slot(task_id)?;
        let now = self.clock.now();
        let state = slot.state.lock();
        Some(SlotDiagnostics {
            in_progress: state.in_progress,
            applied: state.applied,
            recovered: state.recovered,
            last_failure: state.last_failure.clone(),
            since_last_update: state
                .last_update
                .map(|last| now.saturating_duration_since(last)),
        })
    }

    /// Guard-wide counters
    #[must_use]
    pub fn stats(&self) -> GuardStats {
        GuardStats {
            applied: self.counters.applied.load(Ordering::Relaxed),
            skipped_busy: self.counters.busy.load(Ordering::Relaxed),
            skipped_throttled: self.counters.throttled.load(Ordering::Relaxed),
            recovered: self.counters.recovered.load(Ordering::Relaxed),
            tracked_tasks: self.slots.len(),
        }
    }

    fn slot(&self, task_id: &TaskId) -> Option<Arc<Slot>> {
        self.slots.get(task_id).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_insert(&self, task_id: &TaskId) -> Arc<Slot> {
        if let Some(slot) = self.slot(task_id) {
            return slot;
        }
        Arc::clone(self.slots.entry(task_id.clone()).or_default().value())
    }

    /// Busy check, then throttle check, then mark busy and stamp the time.
    /// All three under one slot lock.
    fn admit<'a>(
        &'a self,
        task_id: &'a TaskId,
        mode: RefreshMode,
    ) -> Result<InFlight<'a>, SkipReason> {
        let min_interval = self.policy.interval_for(mode);

        loop {
            let slot = self.slot_or_insert(task_id);
            let now = self.clock.now();

            {
                let mut state = slot.state.lock();

                if state.in_progress {
                    self.counters.busy.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(task_id = %task_id, "update skipped: mutation in flight");
                    return Err(SkipReason::Busy);
                }

                // Idle and retired means already removed from the map.
                if state.retired {
                    continue;
                }

                if let Some(last) = state.last_update {
                    if now.saturating_duration_since(last) < min_interval {
                        self.counters.throttled.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(task_id = %task_id, %mode, "update skipped: throttled");
                        return Err(SkipReason::Throttled);
                    }
                }

                state.in_progress = true;
                state.last_update = Some(state.last_update.map_or(now, |last| last.max(now)));
            }

            return Ok(InFlight {
                slots: &self.slots,
                task_id,
                slot,
            });
        }
    }

    fn settle(
        &self,
        task_id: &TaskId,
        in_flight: InFlight<'_>,
        result: Result<(), MutationError>,
    ) -> UpdateOutcome {
        let outcome = {
            let mut state = in_flight.slot.state.lock();
            match result {
                Ok(()) => {
                    state.applied += 1;
                    self.counters.applied.fetch_add(1, Ordering::Relaxed);
                    UpdateOutcome::Applied
                }
                Err(err) => {
                    state.recovered += 1;
                    state.last_failure = Some(err.to_string());
                    self.counters.recovered.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        task_id = %task_id,
                        error = %err,
                        "display mutation failed; frame dropped"
                    );
                    UpdateOutcome::Recovered(err)
                }
            }
        };

        drop(in_flight);
        outcome
    }
}

impl Default for RefreshGuard {
    fn default() -> Self {
        Self::new(IntervalPolicy::default())
    }
}
