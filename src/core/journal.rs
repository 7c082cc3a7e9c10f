//! Event journal for waiting-room transitions.
//!
//! Provides a bounded in-memory sink for tests and dev, and a channel sink for
//! streaming events to another thread.

use std::collections::VecDeque;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::util::ClientId;

/// Kind of waiting-room transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The client took a seat and joined the queue.
    Seated,
    /// The server picked the client from the head of the queue.
    Selected,
    /// The server finished helping the client.
    Finished,
    /// The client's patience ran out and it left its seat.
    Abandoned,
    /// The client was cancelled while queued and left its seat.
    Withdrawn,
}

/// Journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    /// Order of the mutation inside the room; strictly increasing.
    pub seq: u64,
    /// Client the transition concerns.
    pub client: ClientId,
    /// What happened.
    pub kind: EventKind,
}

/// Journal sink abstraction.
pub trait EventSink: Send {
    /// Record an event.
    fn record(&mut self, event: RoomEvent);
}

/// In-memory sink keeping the latest `max_events` events.
pub struct InMemoryEventSink {
    events: VecDeque<RoomEvent>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(4096)),
            max_events,
        }
    }

    /// Snapshot of stored events, ordered by `seq`.
    #[must_use]
    pub fn events(&self) -> Vec<RoomEvent> {
        let mut events: Vec<_> = self.events.iter().cloned().collect();
        events.sort_by_key(|e| e.seq);
        events
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&mut self, event: RoomEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Forwards events over a crossbeam channel.
pub struct ChannelEventSink {
    tx: Sender<RoomEvent>,
}

impl ChannelEventSink {
    /// Wrap a sender.
    #[must_use]
    pub const fn new(tx: Sender<RoomEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn record(&mut self, event: RoomEvent) {
        // A disconnected receiver just means nobody is listening anymore.
        let _ = self.tx.try_send(event);
    }
}

/// Sink sharing events with a test or observer through an `Arc<Mutex<_>>`.
impl<S: EventSink> EventSink for std::sync::Arc<parking_lot::Mutex<S>> {
    fn record(&mut self, event: RoomEvent) {
        self.lock().record(event);
    }
}
