//! # Grove Sim
//!
//! Headless runner for the Grove agent simulation.
//!
//! ```text
//! grove-sim [config.toml] [ticks] [--json]
//! ```
//!
//! Without a config file the built-in scenario is used. `--json` prints the
//! run summary to stdout as JSON once the run completes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use grove_gameplay::{SimConfig, World};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::summary::RunSummary;

const DEFAULT_TICKS: u64 = 1200;

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    ticks: Option<u64>,
    json: bool,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Self::default();
        for arg in args {
            if arg == "--json" {
                parsed.json = true;
            } else if parsed.config.is_none() && parsed.ticks.is_none() && !is_number(&arg) {
                parsed.config = Some(PathBuf::from(arg));
            } else if parsed.ticks.is_none() {
                let ticks = arg
                    .parse()
                    .with_context(|| format!("invalid tick count '{arg}'"))?;
                parsed.ticks = Some(ticks);
            } else {
                anyhow::bail!("unexpected argument '{arg}'");
            }
        }
        Ok(parsed)
    }
}

fn is_number(arg: &str) -> bool {
    !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit())
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("grove=info".parse()?))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    info!("Grove sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => SimConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            info!("No config given, using the built-in scenario");
            SimConfig::default()
        },
    };

    let summary = run(config, args.ticks.unwrap_or(DEFAULT_TICKS))?;
    summary.log();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    info!("Grove sim complete");
    Ok(())
}

/// Builds a world and runs it for `ticks` fixed steps.
fn run(config: SimConfig, ticks: u64) -> Result<RunSummary> {
    let dt = config.tick_dt();
    let mut world = World::from_config(config).context("failed to build world")?;

    let mut summary = RunSummary::default();
    for _ in 0..ticks {
        world.tick(dt);
        summary.record_all(&world.drain_events());
    }

    summary.ticks = world.tick_count();
    summary.elapsed_secs = world.elapsed();
    summary.survivors = world.agents().len();
    Ok(summary)
}
