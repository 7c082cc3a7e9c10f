//! Supervisor assembling a room, a TA and a group of students from configuration.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::HallwayConfig;
use crate::core::{
    spawn_clients, start_server, ClientReport, EventSink, HallwayError, RoomSnapshot,
    ServerReport, WaitingRoom,
};
use crate::util::duration_to_ms;

/// Why the supervisor ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The served counter reached its target.
    TargetReached,
    /// The configured run time elapsed.
    TimeElapsed,
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Stop condition that fired.
    pub stop_reason: StopReason,
    /// Completed services at shutdown.
    pub served: u64,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u64,
    /// TA tally.
    pub server: ServerReport,
    /// Per-student tallies in spawn order.
    pub clients: Vec<ClientReport>,
    /// Room state after every thread exited.
    pub room: RoomSnapshot,
}

/// One configured run of the hallway.
#[derive(Debug)]
pub struct Simulation {
    config: HallwayConfig,
    room: WaitingRoom,
}

impl Simulation {
    /// Validate `config` and build the room it describes.
    ///
    /// # Errors
    ///
    /// [`HallwayError::InvalidConfig`] if validation fails.
    pub fn from_config(config: HallwayConfig) -> Result<Self, HallwayError> {
        config
            .validate()
            .map_err(|e| HallwayError::InvalidConfig(format!("config invalid: {e}")))?;
        let room = WaitingRoom::new(config.seats);
        Ok(Self { config, room })
    }

    /// Record room transitions into `sink`.
    #[must_use]
    pub fn with_journal<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.room = self.room.with_journal(sink);
        self
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &HallwayConfig {
        &self.config
    }

    /// The room the run will use.
    #[must_use]
    pub const fn room(&self) -> &WaitingRoom {
        &self.room
    }

    /// Run until a stop condition fires, then shut everything down.
    ///
    /// Shutdown cancels the students first, then stops the TA (letting an
    /// in-flight service finish), then joins every thread.
    ///
    /// # Errors
    ///
    /// [`HallwayError::Spawn`] if a thread cannot start and
    /// [`HallwayError::WorkerPanicked`] if one panicked.
    pub fn run(self) -> Result<SimulationReport, HallwayError> {
        let cfg = &self.config;
        let started = Instant::now();
        info!(
            seats = cfg.seats,
            clients = cfg.clients,
            service_ms = cfg.service_ms,
            "starting simulation"
        );

        let server = start_server(&self.room, cfg.service())?;
        let group = match spawn_clients(&self.room, cfg.spawn_plan()) {
            Ok(group) => group,
            Err(e) => {
                if let Err(stop) = server.stop() {
                    warn!(error = %stop, "TA did not stop cleanly");
                }
                return Err(e);
            }
        };
        group.wait_ready();
        info!(spawned = group.spawned(), "all students are in the building");

        let stop_reason = self.wait_for_stop(started);
        info!(?stop_reason, served = self.room.served_count(), "stopping simulation");

        group.cancel_all();
        let server = server.stop();
        let clients = group.join();
        let server = server?;
        let clients = clients?;

        let room = self.room.snapshot();
        assert!(
            room.free_seats == room.capacity && room.queued.is_empty() && room.serving.is_none(),
            "seats leaked after shutdown: {room:?}"
        );

        Ok(SimulationReport {
            stop_reason,
            served: room.served,
            elapsed_ms: duration_to_ms(started.elapsed()),
            server,
            clients,
            room,
        })
    }

    fn wait_for_stop(&self, started: Instant) -> StopReason {
        let target = self.config.stop_target();
        let deadline = self
            .config
            .run_time()
            .and_then(|limit| started.checked_add(limit));
        let poll = self.config.poll_interval();

        loop {
            let served = self.room.served_count();
            if target.is_some_and(|t| served >= t) {
                return StopReason::TargetReached;
            }
            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => return StopReason::TimeElapsed,
                Some(deadline) => poll.min(deadline - now),
                None => poll,
            };
            thread::sleep(nap.max(Duration::from_millis(1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = Simulation::from_config(HallwayConfig::default().with_seats(0)).unwrap_err();
        assert!(matches!(err, HallwayError::InvalidConfig(_)));
    }

    #[test]
    fn test_room_matches_config() {
        let sim = Simulation::from_config(HallwayConfig::default().with_seats(5)).unwrap();
        assert_eq!(sim.room().capacity(), 5);
        assert_eq!(sim.room().free_seats(), 5);
        assert_eq!(sim.config().clients, 10);
    }
}
