//! Refresh guard simulator
//!
//! Hammers one `RefreshGuard` from many threads with randomly chosen task
//! identities and randomly failing mutations. Every mutation tracks how
//! many mutations are live for its task; more than one is an overlap
//! violation.

use crate::guard::{GuardStats, RefreshGuard};
use crate::policy::IntervalPolicy;
use crate::types::{RefreshMode, TaskId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Concurrent callers
    pub workers: usize,
    /// Distinct task identities
    pub tasks: usize,
    /// `try_update` calls per worker
    pub attempts_per_worker: usize,
    /// Probability that a mutation fails, clamped to `[0, 1]`
    pub failure_rate: f64,
    /// Mode used for every attempt
    pub mode: RefreshMode,
    /// Guard intervals under test
    pub policy: IntervalPolicy,
    /// Time each mutation spends "rendering"
    pub mutation_time_us: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            workers: 8,
            tasks: 4,
            attempts_per_worker: 2_000,
            failure_rate: 0.1,
            mode: RefreshMode::Normal,
            policy: IntervalPolicy::new(Duration::from_micros(200), Duration::from_micros(500)),
            mutation_time_us: 50,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated surface detach")]
struct SimulatedDetach;

/// Final report from simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Guard counters at the end of the run
    pub stats: GuardStats,
    /// Times a mutation observed another live mutation for the same task
    pub overlap_violations: u64,
    /// Wall time of the run
    pub elapsed_ms: u64,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        let expected = u64::try_from(self.config.workers.saturating_mul(self.config.attempts_per_worker))
            .unwrap_or(u64::MAX);
        self.overlap_violations == 0 && self.stats.attempts() == expected
    }

    /// Human-readable report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Refresh Guard Simulation Report\n");
        out.push_str("===============================\n");
        out.push_str(&format!("Seed: {}\n", self.config.seed));
        out.push_str(&format!(
            "Workers: {}  Tasks: {}  Attempts/worker: {}\n",
            self.config.workers, self.config.tasks, self.config.attempts_per_worker
        ));
        out.push_str(&format!(
            "Mode: {}  Interval: {}us\n",
            self.config.mode,
            self.config.policy.interval_for(self.config.mode).as_micros()
        ));
        out.push('\n');
        out.push_str(&format!("Applied:            {}\n", self.stats.applied));
        out.push_str(&format!("Recovered:          {}\n", self.stats.recovered));
        out.push_str(&format!("Skipped (busy):     {}\n", self.stats.skipped_busy));
        out.push_str(&format!("Skipped (throttle): {}\n", self.stats.skipped_throttled));
        out.push_str(&format!("Overlap violations: {}\n", self.overlap_violations));
        out.push_str(&format!("Elapsed: {}ms\n", self.elapsed_ms));
        out.push('\n');
        out.push_str(if self.passed() { "Status: PASSED\n" } else { "Status: FAILED\n" });
        out
    }

    /// JSON report
    ///
    /// # Errors
    /// - `serde_json::Error` if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run the simulator to completion
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let guard = RefreshGuard::new(config.policy);
    let tasks: Vec<TaskId> = (0..config.tasks.max(1))
        .map(|i| TaskId::indexed("sim", i))
        .collect();
    let live: Vec<AtomicUsize> = tasks.iter().map(|_| AtomicUsize::new(0)).collect();
    let overlaps = AtomicU64::new(0);
    let failure_rate = config.failure_rate.clamp(0.0, 1.0);
    let mutation_time = Duration::from_micros(config.mutation_time_us);

    tracing::info!(
        workers = config.workers,
        tasks = tasks.len(),
        attempts = config.attempts_per_worker,
        "starting refresh guard simulation"
    );

    let start = Instant::now();
    thread::scope(|scope| {
        for worker in 0..config.workers {
            let (guard, tasks, live, overlaps) = (&guard, &tasks, &live, &overlaps);
            let mode = config.mode;
            let attempts = config.attempts_per_worker;
            let seed = config.seed.wrapping_add(worker as u64);

            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..attempts {
                    let idx = rng.random_range(0..tasks.len());
                    let fail = rng.random_bool(failure_rate);
                    let counter = &live[idx];

                    guard.try_update(&tasks[idx], mode, || {
                        if counter.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlaps.fetch_add(1, Ordering::Relaxed);
                        }
                        thread::sleep(mutation_time);
                        counter.fetch_sub(1, Ordering::SeqCst);
                        if fail {
                            Err(SimulatedDetach)
                        } else {
                            Ok(())
                        }
                    });
                    thread::yield_now();
                }
            });
        }
    });

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let report = SimulatorReport {
        stats: guard.stats(),
        config,
        overlap_violations: overlaps.load(Ordering::Relaxed),
        elapsed_ms,
    };

    tracing::info!(
        applied = report.stats.applied,
        overlaps = report.overlap_violations,
        passed = report.passed(),
        "refresh guard simulation finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SimulatorConfig {
        SimulatorConfig {
            workers: 4,
            tasks: 2,
            attempts_per_worker: 200,
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn simulation_has_no_overlaps() {
        let report = run_simulator(small());
        assert_eq!(report.overlap_violations, 0);
        assert_eq!(report.stats.attempts(), 800);
        assert!(report.stats.applied + report.stats.recovered > 0);
        assert!(report.passed());
    }

    #[test]
    fn always_failing_never_propagates() {
        let report = run_simulator(SimulatorConfig {
            failure_rate: 1.0,
            ..small()
        });
        assert_eq!(report.stats.applied, 0);
        assert!(report.stats.recovered > 0);
        assert!(report.passed());
    }

    #[test]
    fn passed_requires_every_attempt_counted() {
        let mut report = SimulatorReport {
            config: small(),
            stats: GuardStats {
                applied: 500,
                skipped_busy: 300,
                ..GuardStats::default()
            },
            overlap_violations: 0,
            elapsed_ms: 1,
        };
        assert!(report.passed());

        report.stats.skipped_busy -= 1;
        assert!(!report.passed());

        report.stats.skipped_busy += 1;
        report.overlap_violations = 1;
        assert!(!report.passed());
    }

    #[test]
    fn text_report_mentions_status() {
        let report = run_simulator(SimulatorConfig {
            attempts_per_worker: 10,
            ..small()
        });
        let text = report.generate_text();
        assert!(text.contains("Status: PASSED"));
        assert!(text.contains("Overlap violations: 0"));
        assert!(report.to_json().unwrap().contains("\"overlap_violations\": 0"));
    }
}
