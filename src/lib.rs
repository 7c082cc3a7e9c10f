//! # Sleeping TA
//!
//! A bounded waiting room in front of a single server, with clients that only
//! wait as long as their patience allows.
//!
//! One TA helps students one at a time. Students work, then look for a free
//! chair in the hallway. With no chair they go back to work; with a chair they
//! queue in arrival order and wait. A student that is not picked before its
//! patience runs out leaves the chair and tries again later. When the hallway
//! is empty the TA sleeps until someone sits down.
//!
//! ## Pieces
//!
//! - [`core::WaitingRoom`]: seats, the FIFO queue and the client in service,
//!   behind one `parking_lot` mutex and two condition variables.
//! - [`core::start_server`] and [`core::spawn_clients`]: the TA thread and the
//!   spawner that launches student threads behind a [`core::ReadyGate`].
//! - [`core::CancelToken`]: cooperative cancellation that wakes every blocked
//!   wait and returns held seats.
//! - [`builders::Simulation`]: a supervisor that runs the whole hallway from a
//!   [`config::HallwayConfig`] until a stop condition fires.
//!
//! ```rust,no_run
//! use sleeping_ta::builders::Simulation;
//! use sleeping_ta::config::HallwayConfig;
//!
//! # fn main() -> Result<(), sleeping_ta::core::HallwayError> {
//! let cfg = HallwayConfig::default().with_clients(5).with_served_target(Some(5));
//! let report = Simulation::from_config(cfg)?.run()?;
//! assert!(report.served >= 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the room directly
//!
//! ```rust
//! use std::time::Duration;
//! use sleeping_ta::core::{CancelToken, TurnOutcome, WaitingRoom};
//!
//! let room = WaitingRoom::new(1);
//! let id = room.register_client();
//! let seat = room.try_acquire_seat().expect("room starts empty");
//! room.enqueue(seat, id).unwrap();
//!
//! // Nobody serves this room, so the client gives up.
//! let outcome = room.wait_for_turn(id, Duration::from_millis(10), &CancelToken::new());
//! assert_eq!(outcome, TurnOutcome::TimedOut);
//! assert_eq!(room.free_seats(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Waiting room, server, clients, spawner and their coordination primitives.
pub mod core;
/// Configuration model for the hallway simulation.
pub mod config;
/// Supervisor assembled from configuration.
pub mod builders;
/// Tokio adapters over the blocking API.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
