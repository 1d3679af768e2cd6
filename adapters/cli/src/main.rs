#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a scripted round through the shop advisor.

mod config;
mod labels;
mod logging;
mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::scenario::Scenario;

/// Advises `buy` or `refresh` for every shop cycle of a scripted round.
#[derive(Debug, Parser)]
#[command(name = "shop-advisor", version)]
struct Args {
    /// Scenario JSON holding geometry, towers, labels and shop cycles.
    #[arg(long)]
    scenario: PathBuf,
    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log every decision to stderr.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the shop advisor command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let tuning = config::load_tuning(args.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;
    for action in scenario.replay(&tuning)? {
        println!("{action}");
    }
    Ok(())
}
