//! frameguard command implementations
//!
//! `main.rs` parses arguments and dispatches here, so each command can be
//! driven from tests without spawning the binary.

use anyhow::{bail, Context, Result};
use frameguard_core::{
    run_simulator, GuardConfig, IntervalPolicy, RefreshGuard, RefreshMode, SimulatorConfig,
    SimulatorReport, TaskId,
};
use frameguard_progress::{FileSource, ProgressDisplay, RefreshEnd, WriterSurface};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Output goes to stderr
/// so it never interleaves with rendered frames on stdout.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    // A subscriber may already be set (tests); keep the existing one.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
}

/// Configuration from `path`, or defaults when no path is given
///
/// # Errors
/// Returns error if the file cannot be read or fails validation.
pub fn effective_config(path: Option<&Path>) -> Result<GuardConfig> {
    match path {
        Some(path) => GuardConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(GuardConfig::default()),
    }
}

/// Arguments of `frameguard simulate`
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    /// Concurrent callers
    pub workers: usize,
    /// Distinct task identities
    pub tasks: usize,
    /// Attempts per worker
    pub attempts: usize,
    /// Probability that a mutation fails
    pub failure_rate: f64,
    /// RNG seed
    pub seed: u64,
    /// Use fast mode for every attempt
    pub fast: bool,
    /// Normal-mode interval in microseconds
    pub normal_interval_us: u64,
    /// Fast-mode interval in microseconds
    pub fast_interval_us: u64,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        let defaults = SimulatorConfig::default();
        Self {
            workers: defaults.workers,
            tasks: defaults.tasks,
            attempts: defaults.attempts_per_worker,
            failure_rate: defaults.failure_rate,
            seed: defaults.seed,
            fast: false,
            normal_interval_us: 200,
            fast_interval_us: 500,
        }
    }
}

/// Run the concurrency simulator
///
/// # Errors
/// Returns error if the arguments describe an unusable run.
pub fn simulate(args: &SimulateArgs) -> Result<SimulatorReport> {
    if args.workers == 0 || args.tasks == 0 {
        bail!("--workers and --tasks must be at least 1");
    }
    if !(0.0..=1.0).contains(&args.failure_rate) {
        bail!("--failure-rate must be within [0, 1], got {}", args.failure_rate);
    }

    let policy = IntervalPolicy::new(
        Duration::from_micros(args.normal_interval_us),
        Duration::from_micros(args.fast_interval_us),
    );
    policy.validate().context("invalid simulator intervals")?;

    let config = SimulatorConfig {
        seed: args.seed,
        workers: args.workers,
        tasks: args.tasks,
        attempts_per_worker: args.attempts,
        failure_rate: args.failure_rate,
        mode: if args.fast {
            RefreshMode::Fast
        } else {
            RefreshMode::Normal
        },
        policy,
        ..SimulatorConfig::default()
    };
    Ok(run_simulator(config))
}

/// Arguments of `frameguard watch`
#[derive(Debug, Clone)]
pub struct WatchArgs {
    /// Directory holding `<task>.json` files
    pub dir: PathBuf,
    /// Task identity to follow
    pub task: String,
    /// Optional TOML configuration
    pub config: Option<PathBuf>,
}

/// Follow one task's progress files until it finishes
///
/// Ctrl-C stops early; the guard state is released either way.
///
/// # Errors
/// Returns error on an invalid task id or configuration.
pub async fn watch(args: &WatchArgs) -> Result<Option<RefreshEnd>> {
    let config = effective_config(args.config.as_deref())?;
    let task_id = TaskId::new(args.task.clone()).context("invalid --task")?;
    let guard = Arc::new(RefreshGuard::from_config(&config));

    tracing::info!(task_id = %task_id, dir = %args.dir.display(), "watching progress");

    let mut display = ProgressDisplay::new(
        task_id.clone(),
        Arc::clone(&guard),
        FileSource::new(&args.dir),
        WriterSurface::stdout(),
        &config,
    );

    let end = tokio::select! {
        end = display.auto_refresh() => Some(end),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(task_id = %task_id, "interrupted");
            None
        }
    };
    guard.release(&task_id);
    Ok(end)
}

/// Process exit code for a finished watch
#[must_use]
pub fn watch_exit_code(end: Option<RefreshEnd>) -> i32 {
    use frameguard_progress::ProgressStatus;
    match end {
        Some(RefreshEnd::Finished(ProgressStatus::Completed)) | None => 0,
        Some(RefreshEnd::Finished(_)) => 1,
        Some(RefreshEnd::Unavailable) => 2,
        Some(RefreshEnd::TimedOut) => 3,
    }
}
