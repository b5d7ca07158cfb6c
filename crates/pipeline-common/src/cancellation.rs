//! Cooperative cancellation for OS-thread pipelines.
//!
//! Unlike an async cancellation token, nothing here parks a task on a runtime: callers
//! must poll [`CancellationToken::is_cancelled`] (or use [`CancellationToken::sleep`]) at
//! bounded intervals so a `stop_stream` caller gets a bounded worst-case teardown time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The recheck interval used by [`CancellationToken::sleep`] and similar helpers.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A cheaply cloneable flag shared by every thread belonging to one pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancellationToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for up to `duration`, waking every [`POLL_INTERVAL`] to recheck cancellation.
    ///
    /// Returns `true` if cancellation fired before `duration` elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            if remaining.is_zero() {
                return false;
            }
            let step = remaining.min(POLL_INTERVAL);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_on_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn sleep_wakes_early_on_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = std::thread::spawn(move || waiter.sleep(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(10));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
