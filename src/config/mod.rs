//! Configuration model for the hallway simulation.

pub mod hallway;

pub use hallway::{HallwayConfig, ENV_PREFIX};
