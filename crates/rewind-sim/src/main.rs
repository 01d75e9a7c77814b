//! Simulation harness for Rewind adaptive checkpointing.
//!
//! Loads configuration, initializes logging, and runs either the toy
//! message-passing simulation or the strategy benchmark.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$REWIND_CONFIG` or `rewind.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Pick the mode (first CLI argument overrides `harness.mode`)
//! 4. Build the checkpointer from the configured storage tiers
//! 5. Run and print the result
//!
//! The remote storage backends drive their own runtimes and block the
//! calling thread, so `main` is synchronous.

mod benchmark;
mod error;
mod simulation;

use std::path::PathBuf;

use rewind_core::{Checkpointer, HarnessMode, LoggingConfig, RewindConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::SimError;
use crate::simulation::Simulation;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "rewind.yaml";

/// Application entry point for the harness.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a run fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (mut config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(config = %source, "rewind-sim starting");

    // 3. Resolve the mode.
    if let Some(arg) = std::env::args().nth(1) {
        config.harness.mode = parse_mode(&arg)?;
    }
    info!(
        mode = ?config.harness.mode,
        events = config.harness.events,
        rollback_probability = config.harness.rollback_probability,
        seed = config.harness.seed,
        base_interval = config.checkpoint.base_interval,
        layers = config.storage.layers.len(),
        "Configuration loaded"
    );

    // 4-5. Run.
    match config.harness.mode {
        HarnessMode::Simulate => {
            let checkpointer = Checkpointer::from_config(&config).map_err(SimError::from)?;
            let outcome = Simulation::new(checkpointer, &config.harness)?.run()?;
            if config.logging.json {
                println!("{}", serde_json::to_string(&outcome)?);
            } else {
                println!("final event: {}", outcome.final_event);
                println!("events processed: {}", outcome.events_processed);
                println!(
                    "rollbacks: {} ({} resets, {} corrupted checkpoints skipped)",
                    outcome.rollbacks, outcome.resets, outcome.corrupted
                );
                println!("nodes: {}", outcome.nodes.join(", "));
                println!("{}", outcome.report);
            }
        }
        HarnessMode::Benchmark => {
            let results = benchmark::run(&config)?;
            if config.logging.json {
                println!("{}", serde_json::to_string(&results)?);
            } else {
                print!("{}", benchmark::render(&results));
            }
        }
    }

    info!("rewind-sim finished");
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `$REWIND_CONFIG`, falling back to
/// `rewind.yaml` and then to defaults.
///
/// Returns the config and a description of where it came from.
fn load_config() -> Result<(RewindConfig, String), SimError> {
    if let Some(path) = std::env::var_os("REWIND_CONFIG").map(PathBuf::from) {
        let config = RewindConfig::from_file(&path)?;
        return Ok((config, path.display().to_string()));
    }
    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = RewindConfig::from_file(&path)?;
        Ok((config, path.display().to_string()))
    } else {
        Ok((RewindConfig::parse("{}")?, "defaults".to_owned()))
    }
}

fn parse_mode(arg: &str) -> Result<HarnessMode, SimError> {
    match arg {
        "simulate" => Ok(HarnessMode::Simulate),
        "benchmark" => Ok(HarnessMode::Benchmark),
        other => Err(SimError::InvalidHarness {
            reason: format!("unknown mode `{other}` (expected `simulate` or `benchmark`)"),
        }),
    }
}
