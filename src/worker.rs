//! Stage Worker - start/stop lifecycle around one dedicated thread
//!
//! ```text
//!            start()                      stop()
//! STOPPED ───────────▶ RUNNING ───────────────────────▶ STOPPED
//!    ▲  (spawn thread, schedule ticks)  (flag off, cancel token,
//!    │                                   wake channels, join thread)
//!    └── start() while RUNNING / stop() while STOPPED: no-op
//! ```
//!
//! The running flag is an `AtomicBool` so that `stop()` called from an API
//! handler is seen by the worker thread without taking a lock. The lifecycle
//! mutex only serializes concurrent `start()`/`stop()` callers.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::cancel::CancelToken;
use crate::channel::Interruptible;
use crate::error::PipelineError;
use crate::stats::PipelineStats;

/// Lifecycle state of a worker or of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Stopped,
    Running,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Stopped => f.write_str("STOPPED"),
            WorkerState::Running => f.write_str("RUNNING"),
        }
    }
}

/// How often a worker runs its task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// One tick every `period`, measured from the previous tick's start.
    /// A tick that overruns its slot delays the next one; ticks never overlap.
    FixedRate {
        initial_delay: Duration,
        period: Duration,
    },
    /// Back-to-back ticks; each tick is expected to block on a channel
    Continuous,
}

/// One unit of recurring stage work
pub trait StageTask: Send + 'static {
    /// Run one unit of work. Blocking calls must honour `cancel` and surface
    /// an interrupted error when it fires.
    fn tick(&mut self, cancel: &CancelToken) -> Result<(), PipelineError>;
}

struct WorkerHandle {
    thread: JoinHandle<()>,
    cancel: CancelToken,
}

/// An independently start/stop-able unit of recurring background work
pub struct StageWorker {
    name: &'static str,
    schedule: Schedule,
    task: Arc<Mutex<Box<dyn StageTask>>>,
    running: Arc<AtomicBool>,
    /// Channels the task may be blocked on; woken by stop()
    wake_on_stop: Vec<Arc<dyn Interruptible>>,
    stats: Arc<PipelineStats>,
    ticks: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    /// Lifecycle slot: `Some` exactly while a worker thread is owned
    handle: Mutex<Option<WorkerHandle>>,
}

impl StageWorker {
    pub fn new(
        name: &'static str,
        schedule: Schedule,
        task: Box<dyn StageTask>,
        wake_on_stop: Vec<Arc<dyn Interruptible>>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            name,
            schedule,
            task: Arc::new(Mutex::new(task)),
            running: Arc::new(AtomicBool::new(false)),
            wake_on_stop,
            stats,
            ticks: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Start the worker thread. No-op if already running.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut slot = self.handle.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(stage = self.name, "Worker already running, start ignored");
            return Ok(());
        }

        let cancel = CancelToken::new();
        let worker_loop = WorkerLoop {
            name: self.name,
            schedule: self.schedule,
            task: self.task.clone(),
            running: self.running.clone(),
            cancel: cancel.clone(),
            stats: self.stats.clone(),
            ticks: self.ticks.clone(),
            failures: self.failures.clone(),
        };

        let spawned = thread::Builder::new()
            .name(format!("stage-{}", self.name))
            .spawn(move || worker_loop.run());

        match spawned {
            Ok(thread) => {
                *slot = Some(WorkerHandle { thread, cancel });
                info!(stage = self.name, schedule = ?self.schedule, "Worker started");
                Ok(())
            }
            Err(source) => {
                self.running.store(false, Ordering::Release);
                Err(PipelineError::Spawn {
                    stage: self.name,
                    source,
                })
            }
        }
    }

    /// Stop the worker and join its thread. No-op if already stopped.
    ///
    /// Safe while the task is blocked on a full or empty channel: the cancel
    /// token plus [`Interruptible::interrupt`] wake it up.
    pub fn stop(&self) -> Result<(), PipelineError> {
        let mut slot = self.handle.lock();
        if !self.running.swap(false, Ordering::AcqRel) && slot.is_none() {
            return Ok(());
        }

        info!(stage = self.name, "Worker stopping");
        let Some(WorkerHandle { thread, cancel }) = slot.take() else {
            return Ok(());
        };

        cancel.cancel();
        for channel in &self.wake_on_stop {
            channel.interrupt();
        }

        let joined = thread.join();
        info!(
            stage = self.name,
            ticks = self.ticks(),
            failures = self.failures(),
            "Worker stopped and thread handle released"
        );
        joined.map_err(|_| PipelineError::WorkerPanicked { stage: self.name })
    }

    pub fn state(&self) -> WorkerState {
        if self.running.load(Ordering::Acquire) {
            WorkerState::Running
        } else {
            WorkerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ticks executed across all runs (including failed ones)
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that panicked or failed with a non-cancellation error
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Drop for StageWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(stage = self.name, error = %e, "Worker failed to stop on drop");
        }
    }
}

impl fmt::Debug for StageWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageWorker")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================
// WORKER THREAD
// ============================================================

struct WorkerLoop {
    name: &'static str,
    schedule: Schedule,
    task: Arc<Mutex<Box<dyn StageTask>>>,
    running: Arc<AtomicBool>,
    cancel: CancelToken,
    stats: Arc<PipelineStats>,
    ticks: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl WorkerLoop {
    fn run(self) {
        debug!(stage = self.name, "Worker thread running");
        match self.schedule {
            Schedule::FixedRate {
                initial_delay,
                period,
            } => {
                if !initial_delay.is_zero() && self.cancel.wait_timeout(initial_delay) {
                    return;
                }
                let mut next = Instant::now();
                while self.run_tick() {
                    let Some(due) = next.checked_add(period) else {
                        // next slot is past the clock's range
                        if self.cancel.wait_timeout(period) {
                            break;
                        }
                        continue;
                    };
                    next = due;
                    let now = Instant::now();
                    if next > now {
                        if self.cancel.wait_timeout(next - now) {
                            break;
                        }
                    } else {
                        next = now;
                    }
                }
            }
            Schedule::Continuous => while self.run_tick() {},
        }
        debug!(stage = self.name, "Worker thread exiting");
    }

    /// Run one tick; returns false when the loop must end.
    fn run_tick(&self) -> bool {
        // a tick scheduled just before stop() must not do any work
        if !self.running.load(Ordering::Acquire) || self.cancel.is_cancelled() {
            return false;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.task.lock().tick(&self.cancel)));
        self.ticks.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) if e.is_interrupted() => {
                self.stats.incr_interrupted();
                warn!(stage = self.name, "In-flight work interrupted by stop");
                false
            }
            Ok(Err(e)) => {
                self.record_failure();
                error!(stage = self.name, error = %e, "Tick failed, continuing");
                true
            }
            Err(payload) => {
                self.record_failure();
                error!(
                    stage = self.name,
                    panic = panic_message(payload.as_ref()),
                    "Tick panicked, continuing with next tick"
                );
                true
            }
        }
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.stats.incr_tick_failure();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

// ============================================================
// TESTS
// ============================================================
