//! Builders assembling a runnable hallway from configuration.

pub mod simulation;

pub use simulation::{Simulation, SimulationReport, StopReason};
