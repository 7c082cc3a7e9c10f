//! Error types for waiting-room operations.

use thiserror::Error;

use crate::util::ClientId;

/// Errors produced by the hallway core and its supervisor.
#[derive(Debug, Error)]
pub enum HallwayError {
    /// Every seat in the waiting room is taken.
    #[error("no seat available")]
    SeatUnavailable,
    /// The client gave up before the server selected it.
    #[error("patience expired")]
    PatienceExpired,
    /// The task observing this was cancelled.
    #[error("cancelled")]
    Cancelled,
    /// The client is already queued or being served.
    #[error("client {0} is already in the waiting room")]
    DuplicateClient(ClientId),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An OS thread could not be started.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// A server or client thread panicked before reporting.
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl HallwayError {
    /// True for the outcomes a client loop treats as routine.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::SeatUnavailable | Self::PatienceExpired | Self::Cancelled)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
