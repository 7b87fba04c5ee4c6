//! Bounded Channel - blocking FIFO with backpressure
//!
//! Every hop of the pipeline goes through one of these:
//!
//! ```text
//!            push (blocks when full)            pop (blocks when empty)
//! Producer ───────────────────────▶ [ ][ ][ ][ ] ───────────────────────▶ Consumer
//!                                   capacity = N
//! ```
//!
//! # Key Design
//!
//! - **Blocking, not spinning**: a full channel parks the producer on a condvar
//!   until a pop frees a slot. This is the only backpressure mechanism.
//! - **Never drops**: `push` either inserts or returns an error; an interrupted
//!   push leaves the channel untouched.
//! - **Cancellable**: waits check a [`CancelToken`] under the channel mutex, and
//!   [`BoundedChannel::interrupt`] wakes all waiters so they re-check it.
//! - **Encapsulated locking**: one mutex guards the size check and the transfer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

use crate::cancel::CancelToken;

/// Default capacity of the shared trade queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The caller's cancel token fired while it was blocked
    #[error("Operation interrupted by cancellation")]
    Interrupted,

    /// Bounded-wait push timed out on a full channel
    #[error("Channel full (capacity {capacity})")]
    CapacityExhausted { capacity: usize },

    #[error("Channel capacity must be greater than zero")]
    ZeroCapacity,
}

/// Returned by [`BoundedChannel::try_push`]; hands the rejected item back
pub struct PushTimeoutError<T> {
    pub item: T,
    pub capacity: usize,
}

impl<T> PushTimeoutError<T> {
    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for PushTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushTimeoutError")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> From<PushTimeoutError<T>> for ChannelError {
    fn from(err: PushTimeoutError<T>) -> Self {
        ChannelError::CapacityExhausted {
            capacity: err.capacity,
        }
    }
}

/// Anything a stopping worker must wake up
pub trait Interruptible: Send + Sync {
    fn interrupt(&self);
}

/// Fixed-capacity, thread-safe FIFO with blocking push/pop
pub struct BoundedChannel<T> {
    name: &'static str,
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    /// Pushes that found the channel full and had to wait
    backpressure_events: AtomicU64,
}

impl<T> BoundedChannel<T> {
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::ZeroCapacity);
        }
        Ok(Self {
            name,
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            backpressure_events: AtomicU64::new(0),
        })
    }

    /// Insert at the tail, blocking while the channel is full.
    ///
    /// Returns [`ChannelError::Interrupted`] if `cancel` fires before a slot
    /// frees up; the item is dropped by the caller, never inserted.
    pub fn push(&self, item: T, cancel: &CancelToken) -> Result<(), ChannelError> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            let count = self.backpressure_events.fetch_add(1, Ordering::Relaxed);
            if count % 10_000 == 0 {
                tracing::warn!(
                    channel = self.name,
                    total_backpressure = count + 1,
                    "Backpressure detected (1/10000)"
                );
            }
        }
        loop {
            if cancel.is_cancelled() {
                // pass on any wakeup we may have consumed
                self.not_full.notify_one();
                return Err(ChannelError::Interrupted);
            }
            if queue.len() < self.capacity {
                break;
            }
            self.not_full.wait(&mut queue);
        }
        queue.push_back(item);
        drop(queue);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head item, blocking while the channel is empty.
    pub fn pop(&self, cancel: &CancelToken) -> Result<T, ChannelError> {
        let mut queue = self.queue.lock();
        loop {
            if cancel.is_cancelled() {
                self.not_empty.notify_one();
                return Err(ChannelError::Interrupted);
            }
            if let Some(item) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return Ok(item);
            }
            self.not_empty.wait(&mut queue);
        }
    }

    /// Bounded-wait push. On timeout the item is handed back to the caller,
    /// who decides whether to drop or retry.
    pub fn try_push(&self, item: T, timeout: Duration) -> Result<(), PushTimeoutError<T>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut queue = self.queue.lock();
        while queue.len() >= self.capacity {
            if wait_deadline(&self.not_full, &mut queue, deadline)
                && queue.len() >= self.capacity
            {
                return Err(PushTimeoutError {
                    item,
                    capacity: self.capacity,
                });
            }
        }
        queue.push_back(item);
        drop(queue);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Bounded-wait pop; `None` if nothing arrived before `timeout`
    pub fn try_pop(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut queue = self.queue.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return Some(item);
            }
            if wait_deadline(&self.not_empty, &mut queue, deadline) && queue.is_empty() {
                return None;
            }
        }
    }

    /// Wake every blocked pusher and popper so they re-check their cancel token.
    ///
    /// Takes the channel mutex before notifying: a waiter that has already
    /// checked its token is guaranteed to be parked by the time we notify.
    pub fn interrupt(&self) {
        let _guard = self.queue.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.lock().len() >= self.capacity
    }

    pub fn backpressure_events(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

/// Park on `cond` until `deadline`; `None` (a timeout past the clock's range)
/// waits without a deadline. Returns true if the wait timed out.
fn wait_deadline<T>(cond: &Condvar, guard: &mut MutexGuard<'_, T>, deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => cond.wait_until(guard, deadline).timed_out(),
        None => {
            cond.wait(guard);
            false
        }
    }
}

impl<T: Send> Interruptible for BoundedChannel<T> {
    fn interrupt(&self) {
        BoundedChannel::interrupt(self)
    }
}

impl<T> fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================
// TESTS
// ============================================================
