//! One-shot readiness gate released by the spawner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// One-shot barrier: closed until [`open`](Self::open) is called, then open forever.
#[derive(Clone, Default)]
pub struct ReadyGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ReadyGate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate and release every waiter.
    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock();
        if *open {
            return;
        }
        *open = true;
        cvar.notify_all();
    }

    /// Whether the gate has been opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until the gate opens.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock();
        cvar.wait_while(&mut open, |open| !*open);
    }

    /// Block until the gate opens or `timeout` passes. Returns whether it is open.
    #[must_use]
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut open = lock.lock();
        let _ = cvar.wait_while_for(&mut open, |open| !*open, timeout);
        *open
    }

    /// Guard that opens the gate when dropped, however the holder exits.
    #[must_use]
    pub fn open_on_drop(&self) -> OpenOnDrop {
        OpenOnDrop { gate: self.clone() }
    }
}

impl std::fmt::Debug for ReadyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyGate").field("open", &self.is_open()).finish()
    }
}

/// Opens its [`ReadyGate`] on drop.
#[must_use = "the gate opens as soon as the guard is dropped"]
pub struct OpenOnDrop {
    gate: ReadyGate,
}

impl Drop for OpenOnDrop {
    fn drop(&mut self) {
        self.gate.open();
    }
}
