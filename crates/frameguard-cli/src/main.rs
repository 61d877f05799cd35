//! `frameguard` binary: argument parsing and dispatch

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use frameguard_cli::{
    effective_config, init_tracing, simulate, watch, watch_exit_code, SimulateArgs, WatchArgs,
};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("frameguard")
        .version(frameguard_core::VERSION)
        .about("Refresh guard for live progress displays")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Hammer one guard from many threads and check mutual exclusion")
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .default_value("8")
                        .value_parser(value_parser!(usize))
                        .help("Concurrent callers"),
                )
                .arg(
                    Arg::new("tasks")
                        .long("tasks")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Distinct task identities"),
                )
                .arg(
                    Arg::new("attempts")
                        .long("attempts")
                        .default_value("2000")
                        .value_parser(value_parser!(usize))
                        .help("Update attempts per worker"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Probability that a mutation fails"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("normal-interval-us")
                        .long("normal-interval-us")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Normal-mode minimum interval in microseconds"),
                )
                .arg(
                    Arg::new("fast-interval-us")
                        .long("fast-interval-us")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Fast-mode minimum interval in microseconds"),
                )
                .arg(
                    Arg::new("fast")
                        .long("fast")
                        .action(ArgAction::SetTrue)
                        .help("Use fast mode for every attempt"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output report as JSON"),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Render one task's progress files until it finishes")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding <task>.json progress files"),
                )
                .arg(
                    Arg::new("task")
                        .long("task")
                        .required(true)
                        .help("Task identity to follow"),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(config_arg()),
        )
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file")
}

fn simulate_args(args: &ArgMatches) -> SimulateArgs {
    let defaults = SimulateArgs::default();
    SimulateArgs {
        workers: args.get_one("workers").copied().unwrap_or(defaults.workers),
        tasks: args.get_one("tasks").copied().unwrap_or(defaults.tasks),
        attempts: args.get_one("attempts").copied().unwrap_or(defaults.attempts),
        failure_rate: args
            .get_one("failure-rate")
            .copied()
            .unwrap_or(defaults.failure_rate),
        seed: args.get_one("seed").copied().unwrap_or(defaults.seed),
        fast: args.get_flag("fast"),
        normal_interval_us: args
            .get_one("normal-interval-us")
            .copied()
            .unwrap_or(defaults.normal_interval_us),
        fast_interval_us: args
            .get_one("fast-interval-us")
            .copied()
            .unwrap_or(defaults.fast_interval_us),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let sim = simulate_args(args);
            tracing::info!(workers = sim.workers, tasks = sim.tasks, seed = sim.seed, "running simulator");

            // Threads block; keep them off the runtime workers.
            let report = tokio::task::spawn_blocking(move || simulate(&sim))
                .await
                .context("simulator thread")??;

            if args.get_flag("json") {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("watch", args)) => {
            let watch_args = WatchArgs {
                dir: args
                    .get_one::<PathBuf>("dir")
                    .cloned()
                    .context("--dir is required")?,
                task: args
                    .get_one::<String>("task")
                    .cloned()
                    .context("--task is required")?,
                config: args.get_one::<PathBuf>("config").cloned(),
            };
            let end = watch(&watch_args).await?;
            std::process::exit(watch_exit_code(end));
        }
        Some(("config", args)) => {
            let config = effective_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
            print!("{}", config.to_toml_string()?);
        }
        _ => {}
    }
    Ok(())
}
