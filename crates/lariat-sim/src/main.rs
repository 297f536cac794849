//! # Lariat
//!
//! Runs a scripted rope scenario headless and reports what the rope did.
//!
//! Usage: `lariat [config.toml] [scenario.json]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use lariat_sim::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("lariat=info".parse()?))
        .init();

    info!("Lariat sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    // A config named on the command line must load; the default file is optional.
    let mut config = match args.next() {
        Some(path) => SimConfig::load_strict(path)?,
        None => SimConfig::load_from(CONFIG_FILE),
    };
    if let Some(path) = args.next() {
        config.scenario = Some(PathBuf::from(path));
    }

    let scenario = match &config.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(),
    };

    let mut runner = ScenarioRunner::new(&config, scenario);
    let report = runner.run(config.total_ticks());

    info!(
        ticks = report.ticks,
        transitions = report.transitions.len(),
        attaches = report.attaches,
        ledge_climbs = report.ledge_climbs,
        recalls = report.recalls,
        resets = report.resets,
        phase = %report.final_phase,
        "run complete"
    );
    if config.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!("Lariat sim shutdown complete");
    Ok(())
}
