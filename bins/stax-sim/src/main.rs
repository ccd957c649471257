//! Staking issuer simulator.
//!
//! Runs the accrual engine against in-memory custody and issuance so emission
//! schedules and deposit histories can be inspected without a host system.

mod script;
mod settings;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use stax_core::traits::EmissionSchedule;
use stax_issuer::HalvingSchedule;
use tracing::info;

use crate::script::{Script, Simulation};

/// Weighted-pool staking reward simulator.
#[derive(Parser, Debug)]
#[command(name = "stax-sim", version, about = "Simulate staking reward accrual")]
struct Cli {
    /// Issuer config file (toml, json, yaml). STAX_* variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the emission multiplier over [from, to).
    Multiplier(MultiplierArgs),
    /// Run a JSON step script and print the final state.
    Simulate(SimulateArgs),
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct MultiplierArgs {
    #[arg(long)]
    from: u64,
    #[arg(long)]
    to: u64,
    /// Height to clamp against (default: `to`).
    #[arg(long)]
    at: Option<u64>,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Path to the step script.
    script: PathBuf,

    /// Log failed steps and continue instead of stopping.
    #[arg(long)]
    keep_going: bool,

    /// Write an engine snapshot here after the run.
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Resume from a snapshot written by a previous run.
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Clock height before the first step.
    #[arg(long, default_value_t = 0)]
    start_at: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = settings::load(cli.config.as_deref())?;
    info!(
        start = config.start_height,
        bonus_end = config.first_bonus_end_height,
        halving = config.halving_period_length,
        "stax-sim: config loaded"
    );

    match cli.command {
        Command::Multiplier(args) => {
            let schedule = HalvingSchedule::from_config(&config);
            let at = args.at.unwrap_or(args.to);
            let value = schedule.multiplier(args.from, args.to, at)?;
            println!("{value}");
        }
        Command::Simulate(args) => {
            let script: Script = serde_json::from_str(
                &fs::read_to_string(&args.script)
                    .with_context(|| format!("failed to read {}", args.script.display()))?,
            )
            .with_context(|| format!("failed to parse {}", args.script.display()))?;

            let resume = args
                .resume
                .as_ref()
                .map(|p| fs::read(p).with_context(|| format!("failed to read {}", p.display())))
                .transpose()?;

            let mut sim = Simulation::new(config, resume.as_deref(), args.start_at)?;
            let failed = sim.run(&script, args.keep_going)?;
            info!(steps = script.steps.len(), failed, "stax-sim: script finished");

            if let Some(path) = &args.snapshot_out {
                let bytes = sim.issuer.snapshot()?;
                fs::write(path, &bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(bytes = bytes.len(), path = %path.display(), "stax-sim: snapshot written");
            }

            println!("{}", serde_json::to_string_pretty(&sim.report(failed)?)?);
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
