//! Cancel Token - per-worker stop signal
//!
//! A token is an atomic flag plus an interruptible wait. Blocking channel
//! operations take a `&CancelToken` and check it under the channel mutex, so a
//! `cancel()` followed by [`crate::channel::BoundedChannel::interrupt`] can
//! never be missed by a waiter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

/// Cloneable cancellation signal shared between a worker and its controller
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake anyone parked in [`CancelToken::wait_timeout`]
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let _guard = self.inner.lock.lock();
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `timeout` unless cancelled first.
    ///
    /// Returns `true` if the token was (or became) cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        // past the clock's range: wait until cancelled
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.inner.cond.wait(&mut guard),
            }
        }
        self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn test_cancel_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_cancel_wakes_waiter_promptly() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait_timeout(Duration::from_secs(30));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (cancelled, waited) = handle.join().unwrap();
        assert!(cancelled);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_max_timeout_on_cancelled_token() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.wait_timeout(Duration::MAX));
    }

    #[test]
    fn test_max_timeout_woken_by_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait_timeout(Duration::MAX));

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
