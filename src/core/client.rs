//! Student loop: work, look for a seat, wait with bounded patience, repeat.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::{CancelToken, HallwayError, ReadyGate, Release, WaitingRoom};
use crate::util::{duration_to_ms, ClientId, DurationRange};

/// Immutable parameters of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    /// Identity inside the room.
    pub id: ClientId,
    /// How long the client waits once seated.
    pub patience: Duration,
    /// Range the think time of each `Working` period is drawn from.
    pub think: DurationRange,
    /// Leave for good after this many services; `None` loops until cancelled.
    pub help_quota: Option<u32>,
}

/// Tally of one client's visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReport {
    /// Client identity.
    pub id: Option<ClientId>,
    /// Patience in milliseconds.
    pub patience_ms: u64,
    /// Times the client got a seat.
    pub seated: u32,
    /// Times the client was served.
    pub served: u32,
    /// Times the client gave up waiting.
    pub abandoned: u32,
    /// Times every seat was taken.
    pub denied: u32,
    /// True if the client left after reaching its help quota.
    pub finished: bool,
}

/// Run one client until it is cancelled or meets its help quota.
///
/// Blocks on `gate` first so no client starts working before spawning is done.
pub fn run_client(
    room: &WaitingRoom,
    profile: ClientProfile,
    gate: &ReadyGate,
    token: &CancelToken,
) -> ClientReport {
    let mut report = ClientReport {
        id: Some(profile.id),
        patience_ms: duration_to_ms(profile.patience),
        ..ClientReport::default()
    };
    gate.wait();

    let mut rng = rand::rng();
    loop {
        if token.is_cancelled() {
            break;
        }
        let think = profile.think.sample(&mut rng);
        match visit(room, &profile, think, token) {
            Ok(()) => {
                report.seated += 1;
                report.served += 1;
                if profile.help_quota.is_some_and(|quota| report.served >= quota) {
                    info!(client = %profile.id, served = report.served, "student is done with the TA");
                    report.finished = true;
                    break;
                }
            }
            Err(HallwayError::SeatUnavailable) => {
                info!(client = %profile.id, "no seat, will try again later");
                report.denied += 1;
            }
            Err(HallwayError::PatienceExpired) => {
                info!(client = %profile.id, "student got tired of waiting");
                report.seated += 1;
                report.abandoned += 1;
            }
            Err(e) => {
                if !e.is_expected() {
                    error!(client = %profile.id, error = %e, "client stopped");
                }
                break;
            }
        }
    }
    if !report.finished {
        info!(client = %profile.id, "student was interrupted, exiting");
    }
    report
}

/// One trip to the hallway. `Ok` means the client was served and released.
fn visit(
    room: &WaitingRoom,
    profile: &ClientProfile,
    think: Duration,
    token: &CancelToken,
) -> Result<(), HallwayError> {
    let id = profile.id;
    debug!(client = %id, think_ms = duration_to_ms(think), "student is working");
    token.sleep(think)?;

    info!(client = %id, "student wants to see the TA");
    let seat = room.try_acquire_seat().ok_or(HallwayError::SeatUnavailable)?;
    room.enqueue(seat, id)?;
    info!(
        client = %id,
        patience_ms = duration_to_ms(profile.patience),
        "student is waiting in the hallway"
    );
    room.wait_for_turn(id, profile.patience, token).into_result()?;

    info!(client = %id, "student is being helped");
    match room.wait_until_released(id, token) {
        Release::Released => Ok(()),
        Release::Cancelled => Err(HallwayError::Cancelled),
    }
}
