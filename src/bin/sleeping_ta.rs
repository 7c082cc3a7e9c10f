//! Sleeping TA demo.
//!
//! Runs one hallway simulation and logs its report as JSON.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=info sleeping_ta
//! HALLWAY_CONFIG=hallway.json sleeping_ta
//! HALLWAY_SEATS=2 HALLWAY_CLIENTS=6 HALLWAY_RUN_TIME_SECS=20 sleeping_ta
//! ```
//!
//! `HALLWAY_CONFIG` points at a JSON [`HallwayConfig`]; without it the
//! configuration comes from `HALLWAY_*` variables and an optional `.env` file.

use anyhow::Context;
use tracing::info;

use sleeping_ta::builders::Simulation;
use sleeping_ta::config::HallwayConfig;
use sleeping_ta::core::AppResult;
use sleeping_ta::util::init_tracing;

/// Variable naming a JSON configuration file.
const CONFIG_PATH_VAR: &str = "HALLWAY_CONFIG";

fn main() -> AppResult<()> {
    init_tracing();

    let config = load_config()?;
    info!(config = %serde_json::to_string(&config)?, "configuration loaded");

    let report = Simulation::from_config(config)?.run()?;
    info!(
        stop_reason = ?report.stop_reason,
        served = report.served,
        elapsed_ms = report.elapsed_ms,
        "simulation finished"
    );
    info!(report = %serde_json::to_string_pretty(&report)?, "final report");
    Ok(())
}

fn load_config() -> AppResult<HallwayConfig> {
    match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {CONFIG_PATH_VAR}={path}"))?;
            HallwayConfig::from_json_str(&raw).with_context(|| format!("parsing {path}"))
        }
        Err(_) => HallwayConfig::from_env().context("reading HALLWAY_* environment"),
    }
}
