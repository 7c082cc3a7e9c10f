//! Waiting room, its participants and the primitives they coordinate with.

pub mod cancel;
pub mod client;
pub mod error;
pub mod gate;
pub mod journal;
pub mod server;
pub mod spawner;
pub mod waiting_room;

pub use cancel::CancelToken;
pub use client::{run_client, ClientProfile, ClientReport};
pub use error::{AppResult, HallwayError};
pub use gate::{OpenOnDrop, ReadyGate};
pub use journal::{ChannelEventSink, EventKind, EventSink, InMemoryEventSink, RoomEvent};
pub use server::{serve, start_server, ServerHandle, ServerReport};
pub use spawner::{spawn_clients, ClientGroup, SpawnPlan};
pub use waiting_room::{Release, RoomSnapshot, Seat, TurnOutcome, WaitingRoom};
