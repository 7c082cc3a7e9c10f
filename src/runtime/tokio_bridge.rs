//! Async entry points over the blocking hallway API.
//!
//! The room coordinates through `parking_lot` condvars, so every wait here is
//! moved onto tokio's blocking pool with `spawn_blocking` instead of parking a
//! runtime worker.

use crate::builders::{Simulation, SimulationReport};
use crate::core::{ClientGroup, HallwayError};

/// Run `sim` to completion on the blocking pool.
///
/// # Errors
///
/// Whatever [`Simulation::run`] returns, or [`HallwayError::WorkerPanicked`]
/// if the blocking task panicked or was cancelled by the runtime.
pub async fn run_simulation_async(sim: Simulation) -> Result<SimulationReport, HallwayError> {
    tokio::task::spawn_blocking(move || sim.run())
        .await
        .map_err(|e| HallwayError::WorkerPanicked(format!("simulation task: {e}")))?
}

/// Resolve once every client of `group` has been spawned.
///
/// # Errors
///
/// [`HallwayError::WorkerPanicked`] if the blocking task failed.
pub async fn wait_ready_async(group: &ClientGroup) -> Result<(), HallwayError> {
    let gate = group.gate().clone();
    if gate.is_open() {
        return Ok(());
    }
    tokio::task::spawn_blocking(move || gate.wait())
        .await
        .map_err(|e| HallwayError::WorkerPanicked(format!("readiness wait: {e}")))
}
