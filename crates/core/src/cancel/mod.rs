//! Cooperative cancellation and sticky error state.
//!
//! [`CancelState`] is shared by the coordinator, the process runner, and
//! every stage-logic implementation. Cancellation is cooperative: requesting
//! a stop only raises a flag and wakes async waiters; it never kills a
//! thread. Long-running stage logic is contractually obliged to poll
//! [`CancelState::is_stop_requested`] inside any loop of unbounded duration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Process-wide stop flag plus a sticky one-shot error channel.
///
/// The stop flag is checked before and during external command execution.
/// The sticky error, once set, causes the *next* runner invocation to fail
/// immediately; reading it clears it.
#[derive(Default)]
pub struct CancelState {
    stop: AtomicBool,
    notify: Notify,
    sticky_error: Mutex<Option<String>>,
}

impl CancelState {
    /// Create a fresh state with no stop requested and no sticky error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that all in-flight work stop at its next check point.
    ///
    /// Idempotent and non-blocking: it raises the flag and wakes any task
    /// currently parked in [`CancelState::stopped`].
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Clear the stop flag.
    ///
    /// Called at the *start* of every compile call, never at the end, so an
    /// abort issued during stage N prevents stage N but does not linger and
    /// silently cancel stage N+1.
    pub fn reset_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    /// Whether a stop has been requested and not yet cleared.
    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Resolve once a stop has been requested.
    ///
    /// Used by the runner to race child completion against cancellation.
    pub async fn stopped(&self) {
        loop {
            if self.is_stop_requested() {
                return;
            }
            // Registering before re-checking closes the set-then-wait race.
            let notified = self.notify.notified();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Set the sticky error, replacing any previous one.
    ///
    /// Used by collaborators that detect a fault outside the normal
    /// call/return path and need the next external command to refuse to run.
    pub fn set_error(&self, message: impl Into<String>) {
        if let Ok(mut guard) = self.sticky_error.lock() {
            *guard = Some(message.into());
        }
    }

    /// Take the sticky error, clearing it as a side effect.
    ///
    /// Exactly one caller observes a given error; this is what makes the
    /// channel one-shot.
    pub fn take_error(&self) -> Option<String> {
        self.sticky_error.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Discard any pending sticky error without observing it.
    pub fn reset_error(&self) {
        if let Ok(mut guard) = self.sticky_error.lock() {
            *guard = None;
        }
    }
}
