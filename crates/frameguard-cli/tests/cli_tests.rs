//! Command-level tests

use frameguard_cli::{effective_config, simulate, watch, watch_exit_code, SimulateArgs, WatchArgs};
use frameguard_core::GuardConfig;
use frameguard_progress::{ProgressStatus, RefreshEnd};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn config_defaults_without_file() {
    let config = effective_config(None).unwrap();
    assert_eq!(config, GuardConfig::default());
    assert_eq!(config.intervals.normal, Duration::from_secs(2));
}

#[test]
fn config_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frameguard.toml");
    std::fs::write(&path, "[intervals]\nnormal_ms = 1500\nfast_ms = 4000\n").unwrap();

    let config = effective_config(Some(&path)).unwrap();
    assert_eq!(config.intervals.normal, Duration::from_millis(1500));
    assert_eq!(config.intervals.fast, Duration::from_millis(4000));
}

#[test]
fn config_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = effective_config(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn simulate_small_run_passes() {
    let args = SimulateArgs {
        workers: 4,
        tasks: 2,
        attempts: 200,
        ..SimulateArgs::default()
    };
    let report = simulate(&args).unwrap();
    assert!(report.passed());
    assert_eq!(report.overlap_violations, 0);
}

#[test]
fn simulate_rejects_bad_arguments() {
    let bad_rate = SimulateArgs {
        failure_rate: 1.5,
        ..SimulateArgs::default()
    };
    assert!(simulate(&bad_rate).is_err());

    let no_workers = SimulateArgs {
        workers: 0,
        ..SimulateArgs::default()
    };
    assert!(simulate(&no_workers).is_err());

    let inverted = SimulateArgs {
        normal_interval_us: 900,
        fast_interval_us: 100,
        ..SimulateArgs::default()
    };
    assert!(simulate(&inverted).is_err());
}

#[tokio::test]
async fn watch_finishes_on_completed_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("run-1.json"),
        r#"{"analysis_id":"run-1","status":"completed","progress_percentage":100.0}"#,
    )
    .unwrap();

    let end = watch(&WatchArgs {
        dir: dir.path().to_path_buf(),
        task: "run-1".to_string(),
        config: None,
    })
    .await
    .unwrap();

    assert_eq!(end, Some(RefreshEnd::Finished(ProgressStatus::Completed)));
    assert_eq!(watch_exit_code(end), 0);
}

#[tokio::test]
async fn watch_missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let end = watch(&WatchArgs {
        dir: dir.path().to_path_buf(),
        task: "nobody".to_string(),
        config: None,
    })
    .await
    .unwrap();

    assert_eq!(end, Some(RefreshEnd::Unavailable));
    assert_eq!(watch_exit_code(end), 2);
}

#[tokio::test]
async fn watch_rejects_empty_task() {
    let dir = tempfile::tempdir().unwrap();
    let result = watch(&WatchArgs {
        dir: dir.path().to_path_buf(),
        task: String::new(),
        config: None,
    })
    .await;
    assert!(result.is_err());
}

#[test]
fn exit_codes() {
    assert_eq!(watch_exit_code(None), 0);
    assert_eq!(watch_exit_code(Some(RefreshEnd::Finished(ProgressStatus::Failed))), 1);
    assert_eq!(watch_exit_code(Some(RefreshEnd::TimedOut)), 3);
}
