//! Cooperative cancellation shared by the server, the spawner and every client.
//!
//! A [`CancelToken`] is checked at the top of each loop iteration and inside
//! every blocking wait. Sleeps made through [`CancelToken::sleep`] end early on
//! cancellation, and waits inside a [`WaitingRoom`](crate::core::WaitingRoom)
//! are woken through hooks registered with [`CancelToken::on_cancel`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::core::HallwayError;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

type Hook = Box<dyn FnOnce() + Send>;

struct TokenInner {
    id: u64,
    cancelled: AtomicBool,
    /// Paired with `sleepers` so `sleep` cannot miss the cancellation signal.
    sleep_lock: Mutex<()>,
    sleepers: Condvar,
    hooks: Mutex<Vec<Hook>>,
}

/// Cloneable cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
                cancelled: AtomicBool::new(false),
                sleep_lock: Mutex::new(()),
                sleepers: Condvar::new(),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Process-unique identifier of this token (shared by its clones).
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Lock-free check of the cancellation flag.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Signal cancellation. Idempotent; hooks run once, on the first call.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let _guard = self.inner.sleep_lock.lock();
        }
        self.inner.sleepers.notify_all();

        let hooks = std::mem::take(&mut *self.inner.hooks.lock());
        tracing::debug!(token = self.inner.id, hooks = hooks.len(), "cancellation signalled");
        for hook in hooks {
            hook();
        }
    }

    /// Run `hook` when the token is cancelled, or right away if it already is.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = self.inner.hooks.lock();
        if self.is_cancelled() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }

    /// Block for `duration`, returning early with `Cancelled` if the token fires.
    ///
    /// # Errors
    ///
    /// Returns [`HallwayError::Cancelled`] when the token is cancelled before or
    /// during the sleep.
    pub fn sleep(&self, duration: Duration) -> Result<(), HallwayError> {
        let mut guard = self.inner.sleep_lock.lock();
        if !duration.is_zero() {
            let _ = self
                .inner
                .sleepers
                .wait_while_for(&mut guard, |_| !self.is_cancelled(), duration);
        }
        drop(guard);
        if self.is_cancelled() {
            return Err(HallwayError::Cancelled);
        }
        Ok(())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_sleep_runs_to_completion() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(20)).is_ok());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = sleeper.sleep(Duration::from_secs(10));
            (result, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (result, elapsed) = handle.join().unwrap();
        assert!(matches!(result, Err(HallwayError::Cancelled)));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_hooks_run_once() {
        let token = CancelToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_after_cancel_runs_immediately() {
        let token = CancelToken::new();
        token.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        token.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert_eq!(token.id(), clone.id());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.sleep(Duration::ZERO).is_err());
    }
}
