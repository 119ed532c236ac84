//! Command-line runner for the Symbiosis simulation.
//!
//! Loads the YAML configuration, applies command-line overrides, runs one
//! simulation to its horizon, and writes exit records and the daily
//! population census to the files named in the config.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Parse command-line arguments
//! 3. Load configuration from `symbiosis-config.yaml` (or `--config`)
//! 4. Apply overrides and validate
//! 5. Open telemetry files
//! 6. Run the simulation
//! 7. Flush telemetry and log the result

mod error;
mod observer;

use std::path::{Path, PathBuf};

use clap::Parser;
use symbiosis_core::runner;
use symbiosis_core::SimulationConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer::FileObserver;

/// Symbiont population dynamics in a sponge host.
#[derive(Parser, Debug)]
#[command(name = "symbiosis-engine")]
#[command(about = "Run a discrete-event symbiosis simulation")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "symbiosis-config.yaml")]
    config: PathBuf,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the simulated horizon, in days
    #[arg(long)]
    horizon: Option<f64>,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the run, or telemetry output fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("symbiosis-engine starting");

    // 2. Parse arguments.
    let args = Args::parse();

    // 3. Load configuration.
    let mut config = load_config(&args.config)?;

    // 4. Apply overrides and validate.
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(horizon) = args.horizon {
        config.run.max_simulated_time = horizon;
    }
    config.validate().map_err(EngineError::from)?;
    info!(
        seed = config.run.seed,
        horizon = config.run.max_simulated_time,
        initial_symbionts = config.run.initial_symbionts,
        arrivals = config.run.arrivals_enabled,
        grid = %config.grid.dimensions(),
        capacity_per_cell = config.grid.capacity_per_cell,
        clades = config.clades.len(),
        "Configuration loaded"
    );

    // 5. Open telemetry files.
    let mut observer = FileObserver::create(&config.output)?;

    // 6. Run the simulation.
    let result = runner::run(&config, &mut observer).map_err(EngineError::from)?;

    // 7. Flush telemetry and log results.
    let records = observer.records_written();
    observer.finish()?;
    runner::log_simulation_end(&result);

    info!(
        run_id = %result.run_id,
        exit_records = records,
        "symbiosis-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration from `path`.
///
/// A missing file means the built-in defaults.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        let config = SimulationConfig::from_file(path)?;
        info!(path = %path.display(), "Config file loaded");
        Ok(config)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
