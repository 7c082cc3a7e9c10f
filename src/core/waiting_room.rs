//! The shared waiting room: seats, the FIFO hallway queue and the client in service.
//!
//! All state lives behind one `parking_lot::Mutex`. Two condition variables
//! split the waiters by what they wait for:
//!
//! - `queue_changed` wakes the server when a client joins an empty queue.
//! - `turn_changed` wakes clients when the served client changes.
//!
//! Every waiter re-checks its own predicate on wake-up, and every blocking
//! wait also ends when the caller's [`CancelToken`] fires. The lock is held
//! only for the queue/seat mutation itself, never while a task sleeps.
//!
//! Seat accounting holds after every mutation:
//! `free + reserved + queued + serving == capacity`. A violation is a logic bug
//! and panics.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::journal::{EventKind, EventSink, RoomEvent};
use crate::core::{CancelToken, HallwayError};
use crate::util::ClientId;

/// Result of [`WaitingRoom::wait_for_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum TurnOutcome {
    /// The server selected this client.
    Served,
    /// Patience ran out first; the seat was returned.
    TimedOut,
    /// The caller's token fired first; the seat was returned.
    Cancelled,
}

impl TurnOutcome {
    /// Map the non-served outcomes onto their error kinds.
    ///
    /// # Errors
    ///
    /// `TimedOut` becomes [`HallwayError::PatienceExpired`], `Cancelled`
    /// becomes [`HallwayError::Cancelled`].
    pub fn into_result(self) -> Result<(), HallwayError> {
        match self {
            Self::Served => Ok(()),
            Self::TimedOut => Err(HallwayError::PatienceExpired),
            Self::Cancelled => Err(HallwayError::Cancelled),
        }
    }
}

/// Result of [`WaitingRoom::wait_until_released`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Release {
    /// The server finished helping this client.
    Released,
    /// The caller's token fired mid-service; the server still returns the seat.
    Cancelled,
}

/// Point-in-time view of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Total seats.
    pub capacity: usize,
    /// Seats nobody holds.
    pub free_seats: usize,
    /// Queued clients, head first.
    pub queued: Vec<ClientId>,
    /// Client currently being helped.
    pub serving: Option<ClientId>,
    /// Completed services so far.
    pub served: u64,
}

struct RoomState {
    free: usize,
    /// Seats handed out by `try_acquire_seat` but not yet enqueued.
    reserved: usize,
    queue: VecDeque<ClientId>,
    serving: Option<ClientId>,
    /// Served clients that have not yet observed their release.
    finished: HashSet<ClientId>,
    /// Clients cancelled while being served.
    detached: HashSet<ClientId>,
    /// Tokens that already carry a wake hook for this room.
    watched: HashSet<u64>,
    seq: u64,
}

impl RoomState {
    fn is_selected(&self, id: ClientId) -> bool {
        self.serving == Some(id) || self.finished.contains(&id)
    }

    fn event(&mut self, client: ClientId, kind: EventKind) -> RoomEvent {
        self.seq += 1;
        RoomEvent {
            seq: self.seq,
            client,
            kind,
        }
    }

    fn assert_invariants(&self, capacity: usize) {
        assert!(
            self.free <= capacity,
            "free seats {} exceed capacity {capacity}",
            self.free
        );
        let held = self.reserved + self.queue.len() + usize::from(self.serving.is_some());
        assert_eq!(
            self.free + held,
            capacity,
            "seat accounting broken: free={} reserved={} queued={} serving={:?}",
            self.free,
            self.reserved,
            self.queue.len(),
            self.serving
        );
    }
}

struct Shared {
    capacity: usize,
    state: Mutex<RoomState>,
    queue_changed: Condvar,
    turn_changed: Condvar,
    served: AtomicU64,
    next_id: AtomicU64,
    journal: Mutex<Option<Box<dyn EventSink>>>,
}

/// Cloneable handle to one waiting room.
#[derive(Clone)]
pub struct WaitingRoom {
    shared: Arc<Shared>,
}

/// A reserved seat. Enqueue it with [`WaitingRoom::enqueue`]; dropping it returns the seat.
#[must_use = "dropping a seat returns it to the room"]
pub struct Seat {
    room: WaitingRoom,
    held: bool,
}

impl Drop for Seat {
    fn drop(&mut self) {
        if self.held {
            self.room.return_reserved();
        }
    }
}

impl std::fmt::Debug for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seat").field("held", &self.held).finish()
    }
}

impl WaitingRoom {
    /// Create a room with `capacity` seats.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(RoomState {
                    free: capacity,
                    reserved: 0,
                    queue: VecDeque::with_capacity(capacity),
                    serving: None,
                    finished: HashSet::new(),
                    detached: HashSet::new(),
                    watched: HashSet::new(),
                    seq: 0,
                }),
                queue_changed: Condvar::new(),
                turn_changed: Condvar::new(),
                served: AtomicU64::new(0),
                next_id: AtomicU64::new(1),
                journal: Mutex::new(None),
            }),
        }
    }

    /// Attach a journal sink.
    #[must_use]
    pub fn with_journal<S: EventSink + 'static>(self, sink: S) -> Self {
        *self.shared.journal.lock() = Some(Box::new(sink));
        self
    }

    /// Number of seats.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Hand out the next sequential client id (starting at 1).
    pub fn register_client(&self) -> ClientId {
        ClientId(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Completed services; monotonic and lock-free.
    #[must_use]
    pub fn served_count(&self) -> u64 {
        self.shared.served.load(Ordering::Acquire)
    }

    /// Seats currently free.
    #[must_use]
    pub fn free_seats(&self) -> usize {
        self.shared.state.lock().free
    }

    /// Consistent view of the whole room.
    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        let state = self.shared.state.lock();
        RoomSnapshot {
            capacity: self.shared.capacity,
            free_seats: state.free,
            queued: state.queue.iter().copied().collect(),
            serving: state.serving,
            served: self.served_count(),
        }
    }

    /// Take a seat if one is free. Never blocks.
    pub fn try_acquire_seat(&self) -> Option<Seat> {
        let mut state = self.shared.state.lock();
        if state.free == 0 {
            return None;
        }
        state.free -= 1;
        state.reserved += 1;
        state.assert_invariants(self.shared.capacity);
        drop(state);
        Some(Seat {
            room: self.clone(),
            held: true,
        })
    }

    /// Join the tail of the queue with a seat obtained from [`try_acquire_seat`](Self::try_acquire_seat).
    ///
    /// A finished service `id` has not yet collected with
    /// [`wait_until_released`](Self::wait_until_released) is discarded.
    ///
    /// # Errors
    ///
    /// [`HallwayError::DuplicateClient`] if `id` is already queued or being
    /// served; the seat is returned to the room.
    ///
    /// # Panics
    ///
    /// If `seat` was issued by a different room.
    pub fn enqueue(&self, mut seat: Seat, id: ClientId) -> Result<(), HallwayError> {
        assert!(
            Arc::ptr_eq(&seat.room.shared, &self.shared),
            "seat belongs to another waiting room"
        );
        let mut state = self.shared.state.lock();
        if state.serving == Some(id) || state.queue.contains(&id) {
            drop(state);
            return Err(HallwayError::DuplicateClient(id));
        }
        seat.held = false;
        state.reserved -= 1;
        state.finished.remove(&id);
        state.queue.push_back(id);
        let queued = state.queue.len();
        let event = state.event(id, EventKind::Seated);
        state.assert_invariants(self.shared.capacity);
        drop(state);

        self.shared.queue_changed.notify_one();
        self.record(event);
        debug!(client = %id, queued, "client seated");
        Ok(())
    }

    /// Block until the server selects `id`, `patience` elapses, or `token` fires.
    ///
    /// On `TimedOut`/`Cancelled` the client is removed from the queue (the rest
    /// keep their order) and its seat is returned. If the server selected the
    /// client before the wait resolved, the result is always `Served`.
    ///
    /// # Panics
    ///
    /// If `id` is neither queued nor selected when the wait gives up.
    pub fn wait_for_turn(&self, id: ClientId, patience: Duration, token: &CancelToken) -> TurnOutcome {
        self.watch(token);
        let deadline = Instant::now().checked_add(patience);

        let mut state = self.shared.state.lock();
        let waiting = |s: &mut RoomState| !s.is_selected(id) && !token.is_cancelled();
        match deadline {
            Some(deadline) => {
                let _ = self
                    .shared
                    .turn_changed
                    .wait_while_until(&mut state, waiting, deadline);
            }
            None => self.shared.turn_changed.wait_while(&mut state, waiting),
        }

        if state.is_selected(id) {
            return TurnOutcome::Served;
        }

        let Some(pos) = state.queue.iter().position(|&c| c == id) else {
            panic!("client {id} waited for a turn without being queued");
        };
        state.queue.remove(pos);
        state.free += 1;
        let (kind, outcome) = if token.is_cancelled() {
            (EventKind::Withdrawn, TurnOutcome::Cancelled)
        } else {
            (EventKind::Abandoned, TurnOutcome::TimedOut)
        };
        let event = state.event(id, kind);
        state.assert_invariants(self.shared.capacity);
        drop(state);

        self.record(event);
        outcome
    }

    /// Block a served client until the server finishes with it or `token` fires.
    ///
    /// # Panics
    ///
    /// If `id` was never selected.
    pub fn wait_until_released(&self, id: ClientId, token: &CancelToken) -> Release {
        self.watch(token);
        let mut state = self.shared.state.lock();
        self.shared
            .turn_changed
            .wait_while(&mut state, |s| !s.finished.contains(&id) && !token.is_cancelled());

        if state.finished.remove(&id) {
            return Release::Released;
        }
        assert_eq!(
            state.serving,
            Some(id),
            "client {id} waited for release without being served"
        );
        state.detached.insert(id);
        Release::Cancelled
    }

    /// Server side: sleep while the queue is empty, then select its head.
    ///
    /// Returns `None` only once `token` is cancelled; no client is selected
    /// after that.
    ///
    /// # Panics
    ///
    /// If called while a previous client has not been finished.
    pub fn next_to_serve(&self, token: &CancelToken) -> Option<ClientId> {
        self.watch(token);
        let mut state = self.shared.state.lock();
        assert!(
            state.serving.is_none(),
            "next client requested while still serving {:?}",
            state.serving
        );
        if state.queue.is_empty() && !token.is_cancelled() {
            info!("TA is sleeping");
        }
        self.shared
            .queue_changed
            .wait_while(&mut state, |s| s.queue.is_empty() && !token.is_cancelled());
        if token.is_cancelled() {
            return None;
        }

        let id = state.queue.pop_front()?;
        state.serving = Some(id);
        let event = state.event(id, EventKind::Selected);
        state.assert_invariants(self.shared.capacity);
        drop(state);

        self.shared.turn_changed.notify_all();
        self.record(event);
        Some(id)
    }

    /// Server side: end the service of `id`, return its seat and count it.
    ///
    /// # Panics
    ///
    /// If `id` is not the client currently being served.
    pub fn finish_serving(&self, id: ClientId) {
        let mut state = self.shared.state.lock();
        assert_eq!(
            state.serving,
            Some(id),
            "finish_serving({id}) does not match the client in service"
        );
        state.serving = None;
        state.free += 1;
        if !state.detached.remove(&id) {
            state.finished.insert(id);
        }
        self.shared.served.fetch_add(1, Ordering::AcqRel);
        let event = state.event(id, EventKind::Finished);
        state.assert_invariants(self.shared.capacity);
        drop(state);

        self.shared.turn_changed.notify_all();
        self.record(event);
    }

    fn return_reserved(&self) {
        let mut state = self.shared.state.lock();
        assert!(state.reserved > 0, "seat returned twice");
        state.reserved -= 1;
        state.free += 1;
        state.assert_invariants(self.shared.capacity);
    }

    /// Make sure cancelling `token` wakes every waiter of this room.
    fn watch(&self, token: &CancelToken) {
        if !self.shared.state.lock().watched.insert(token.id()) {
            return;
        }
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        token.on_cancel(move || {
            if let Some(shared) = weak.upgrade() {
                // Notify under the lock so a waiter between its check and its wait cannot miss it.
                let guard = shared.state.lock();
                shared.queue_changed.notify_all();
                shared.turn_changed.notify_all();
                drop(guard);
            }
        });
    }

    fn record(&self, event: RoomEvent) {
        if let Some(sink) = self.shared.journal.lock().as_mut() {
            sink.record(event);
        }
    }
}

impl std::fmt::Debug for WaitingRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingRoom")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_accounting() {
        let room = WaitingRoom::new(2);
        let a = room.try_acquire_seat().unwrap();
        let b = room.try_acquire_seat().unwrap();
        assert!(room.try_acquire_seat().is_none());
        assert_eq!(room.free_seats(), 0);

        drop(a);
        assert_eq!(room.free_seats(), 1);

        room.enqueue(b, ClientId(1)).unwrap();
        assert_eq!(room.free_seats(), 1);
        assert_eq!(room.snapshot().queued, vec![ClientId(1)]);
    }

    #[test]
    fn test_duplicate_enqueue_returns_seat() {
        let room = WaitingRoom::new(3);
        room.enqueue(room.try_acquire_seat().unwrap(), ClientId(7)).unwrap();

        let again = room.try_acquire_seat().unwrap();
        let err = room.enqueue(again, ClientId(7)).unwrap_err();
        assert!(matches!(err, HallwayError::DuplicateClient(ClientId(7))));
        assert_eq!(room.free_seats(), 2);
    }

    #[test]
    fn test_register_client_is_sequential() {
        let room = WaitingRoom::new(1);
        assert_eq!(room.register_client(), ClientId(1));
        assert_eq!(room.register_client(), ClientId(2));
    }

    #[test]
    fn test_serve_cycle_returns_seat_and_counts() {
        let room = WaitingRoom::new(1);
        let token = CancelToken::new();
        let id = room.register_client();
        room.enqueue(room.try_acquire_seat().unwrap(), id).unwrap();

        assert_eq!(room.next_to_serve(&token), Some(id));
        assert_eq!(room.free_seats(), 0);
        assert_eq!(room.wait_for_turn(id, Duration::ZERO, &token), TurnOutcome::Served);

        room.finish_serving(id);
        assert_eq!(room.served_count(), 1);
        assert_eq!(room.free_seats(), 1);
        assert_eq!(room.wait_until_released(id, &token), Release::Released);
    }

    #[test]
    fn test_next_to_serve_returns_none_when_cancelled() {
        let room = WaitingRoom::new(1);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(room.next_to_serve(&token), None);
    }

    #[test]
    #[should_panic(expected = "does not match the client in service")]
    fn test_finish_without_selection_panics() {
        let room = WaitingRoom::new(1);
        room.finish_serving(ClientId(1));
    }

    #[test]
    fn test_turn_outcome_into_result() {
        assert!(TurnOutcome::Served.into_result().is_ok());
        assert!(matches!(
            TurnOutcome::TimedOut.into_result(),
            Err(HallwayError::PatienceExpired)
        ));
        assert!(matches!(
            TurnOutcome::Cancelled.into_result(),
            Err(HallwayError::Cancelled)
        ));
    }
}
