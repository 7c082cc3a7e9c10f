//! The TA: one server thread draining the waiting room in FIFO order.
//!
//! The loop is `Idle -> Serving -> Idle`. Cancellation is checked at the top
//! of each iteration and wakes the idle wait; a service already in progress
//! always runs to completion and is finished before the thread exits.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{CancelToken, HallwayError, WaitingRoom};
use crate::util::duration_to_ms;

/// What the server did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReport {
    /// Services completed by this server.
    pub served: u64,
}

/// Handle to a running server thread.
#[derive(Debug)]
pub struct ServerHandle {
    token: CancelToken,
    thread: JoinHandle<ServerReport>,
}

impl ServerHandle {
    /// Whether the server thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Cancel the server and wait for it to exit.
    ///
    /// # Errors
    ///
    /// [`HallwayError::WorkerPanicked`] if the server thread panicked.
    pub fn stop(self) -> Result<ServerReport, HallwayError> {
        self.token.cancel();
        self.thread
            .join()
            .map_err(|_| HallwayError::WorkerPanicked("server thread".into()))
    }
}

/// Start the TA on its own thread. Each service takes `service` wall-clock time.
///
/// # Errors
///
/// [`HallwayError::Spawn`] if the OS refuses the thread.
pub fn start_server(room: &WaitingRoom, service: Duration) -> Result<ServerHandle, HallwayError> {
    let token = CancelToken::new();
    let thread = thread::Builder::new().name("ta".into()).spawn({
        let room = room.clone();
        let token = token.clone();
        move || serve(&room, service, &token)
    })?;
    info!(service_ms = duration_to_ms(service), "TA started");
    Ok(ServerHandle { token, thread })
}

/// Server loop; returns once `token` is cancelled.
pub fn serve(room: &WaitingRoom, service: Duration, token: &CancelToken) -> ServerReport {
    let mut report = ServerReport::default();
    while !token.is_cancelled() {
        let Some(id) = room.next_to_serve(token) else {
            break;
        };
        info!(client = %id, "TA is helping");
        thread::sleep(service);
        room.finish_serving(id);
        report.served += 1;
        info!(client = %id, total = room.served_count(), "TA finished helping");
    }
    debug!(served = report.served, "TA stopped");
    report
}
