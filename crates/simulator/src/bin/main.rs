//! BDB commissioning simulator CLI.
//!
//! Runs a TOML scenario and prints what the application would have seen.

use anyhow::{bail, Result};
use bdb_simulator::{Scenario, ScenarioConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bdb-sim")]
#[command(about = "Run a BDB commissioning scenario against a scripted network")]
#[command(version)]
struct Cli {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Longest simulated time any single step may take (e.g., "90s", "10m")
    #[arg(long, default_value = "10m")]
    step_limit: humantime::Duration,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Fail unless every step returns the controller to idle
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ScenarioConfig::load(&cli.scenario)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let step_limit = *cli.step_limit;
    let report = Scenario::new(config)?.run(step_limit)?;
    println!("{report}");

    if cli.strict && !report.all_completed() {
        bail!(
            "a step did not finish within {}",
            humantime::format_duration(step_limit)
        );
    }
    Ok(())
}
