//! Spawner: launches client threads with independent patience and opens the readiness gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::core::client::{run_client, ClientProfile, ClientReport};
use crate::core::{CancelToken, HallwayError, ReadyGate, WaitingRoom};
use crate::util::{duration_to_ms, DurationRange};

/// How many clients to launch and with which parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPlan {
    /// Number of clients.
    pub clients: usize,
    /// Range each client's patience is drawn from.
    pub patience: DurationRange,
    /// Range each think period is drawn from.
    pub think: DurationRange,
    /// Pause between two creations.
    pub stagger: Duration,
    /// Services after which a client leaves for good.
    pub help_quota: Option<u32>,
}

/// Handle to a spawned group of clients.
#[derive(Debug)]
pub struct ClientGroup {
    token: CancelToken,
    gate: ReadyGate,
    spawned: Arc<AtomicUsize>,
    spawner: JoinHandle<Vec<JoinHandle<ClientReport>>>,
}

impl ClientGroup {
    /// Readiness gate the clients block on.
    #[must_use]
    pub const fn gate(&self) -> &ReadyGate {
        &self.gate
    }

    /// Clients launched so far.
    #[must_use]
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Acquire)
    }

    /// Block until the spawner opens the gate.
    pub fn wait_ready(&self) {
        self.gate.wait();
    }

    /// Block until the gate opens or `timeout` passes. Returns whether it is open.
    #[must_use]
    pub fn wait_ready_for(&self, timeout: Duration) -> bool {
        self.gate.wait_for(timeout)
    }

    /// Cancel the spawner and every client. Queued clients give their seats back.
    pub fn cancel_all(&self) {
        info!(spawned = self.spawned(), "cancelling all students");
        self.token.cancel();
    }

    /// Wait for the spawner and every client thread to exit.
    ///
    /// Clients only exit on cancellation or when they meet their help quota,
    /// so call [`cancel_all`](Self::cancel_all) first unless every client has a quota.
    ///
    /// # Errors
    ///
    /// [`HallwayError::WorkerPanicked`] if the spawner or any client panicked;
    /// the remaining threads are still joined.
    pub fn join(self) -> Result<Vec<ClientReport>, HallwayError> {
        let handles = self
            .spawner
            .join()
            .map_err(|_| HallwayError::WorkerPanicked("spawner thread".into()))?;

        let mut reports = Vec::with_capacity(handles.len());
        let mut failure = None;
        for handle in handles {
            let name = handle.thread().name().unwrap_or("student").to_owned();
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(_) => failure = Some(HallwayError::WorkerPanicked(name)),
            }
        }
        failure.map_or(Ok(reports), Err)
    }
}

/// Launch `plan.clients` clients on their own threads, staggered by `plan.stagger`.
///
/// Returns as soon as the spawner thread is running. The gate opens once every
/// client exists, or as soon as spawning stops early.
///
/// # Errors
///
/// [`HallwayError::Spawn`] if the spawner thread itself cannot start.
pub fn spawn_clients(room: &WaitingRoom, plan: SpawnPlan) -> Result<ClientGroup, HallwayError> {
    let token = CancelToken::new();
    let gate = ReadyGate::new();
    let spawned = Arc::new(AtomicUsize::new(0));

    let spawner = thread::Builder::new().name("spawner".into()).spawn({
        let room = room.clone();
        let token = token.clone();
        let gate = gate.clone();
        let spawned = Arc::clone(&spawned);
        move || spawn_loop(&room, plan, &gate, &token, &spawned)
    })?;

    Ok(ClientGroup {
        token,
        gate,
        spawned,
        spawner,
    })
}

fn spawn_loop(
    room: &WaitingRoom,
    plan: SpawnPlan,
    gate: &ReadyGate,
    token: &CancelToken,
    spawned: &AtomicUsize,
) -> Vec<JoinHandle<ClientReport>> {
    let _open = gate.open_on_drop();
    let mut rng = rand::rng();
    let mut handles = Vec::with_capacity(plan.clients);

    for n in 0..plan.clients {
        if token.is_cancelled() {
            break;
        }
        let profile = ClientProfile {
            id: room.register_client(),
            patience: plan.patience.sample(&mut rng),
            think: plan.think,
            help_quota: plan.help_quota,
        };
        let spawn = thread::Builder::new()
            .name(format!("student-{}", profile.id))
            .spawn({
                let room = room.clone();
                let gate = gate.clone();
                let token = token.clone();
                move || run_client(&room, profile, &gate, &token)
            });
        match spawn {
            Ok(handle) => {
                handles.push(handle);
                spawned.fetch_add(1, Ordering::AcqRel);
                info!(
                    client = %profile.id,
                    patience_ms = duration_to_ms(profile.patience),
                    "spawner created student"
                );
            }
            Err(e) => {
                error!(client = %profile.id, error = %e, "failed to spawn student");
                break;
            }
        }
        if n + 1 < plan.clients && token.sleep(plan.stagger).is_err() {
            break;
        }
    }

    if handles.len() == plan.clients {
        info!(spawned = handles.len(), "spawner has created all students");
    } else {
        warn!(spawned = handles.len(), wanted = plan.clients, "spawner stopped early");
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(clients: usize) -> SpawnPlan {
        SpawnPlan {
            clients,
            patience: DurationRange::from_millis(100, 200),
            think: DurationRange::from_millis(1000, 1000),
            stagger: Duration::ZERO,
            help_quota: None,
        }
    }

    #[test]
    fn test_all_clients_spawned_before_ready() {
        let room = WaitingRoom::new(3);
        let group = spawn_clients(&room, plan(4)).unwrap();
        assert!(group.wait_ready_for(Duration::from_secs(5)));
        assert_eq!(group.spawned(), 4);

        group.cancel_all();
        let reports = group.join().unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| (100..=200).contains(&r.patience_ms)));
    }

    #[test]
    fn test_cancel_mid_spawn_still_opens_gate() {
        let room = WaitingRoom::new(3);
        let group = spawn_clients(
            &room,
            SpawnPlan {
                stagger: Duration::from_secs(10),
                ..plan(5)
            },
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        group.cancel_all();
        assert!(group.wait_ready_for(Duration::from_secs(5)));

        let reports = group.join().unwrap();
        assert!(!reports.is_empty());
        assert!(reports.len() < 5);
        assert_eq!(room.free_seats(), 3);
    }
}
