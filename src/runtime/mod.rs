//! Runtime adapters for async callers.

pub mod tokio_bridge;

pub use tokio_bridge::{run_simulation_async, wait_ready_async};
