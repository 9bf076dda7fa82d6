//! Game-thread dispatch for playmesh.
//!
//! Room events arrive on whatever thread the room service uses. Game code
//! wants its callbacks on one thread it controls (the main/update loop).
//! This crate sits between the two:
//!
//! - [`DispatchHandle::run_on_game_thread`] queues a job from any thread
//!   without waiting for the game loop.
//! - [`GameThreadQueue::run_pending`] runs the queued jobs on the game
//!   thread, once per frame, in submission order.
//! - [`FrameDriver`] drains a queue on a fixed frame rate for applications
//!   that do not have an update loop of their own.
//!
//! # Integration
//!
//! ```ignore
//! let queue = GameThreadQueue::new(DispatchConfig::default());
//! let handle = queue.handle(); // give this to the session layer
//! loop {
//!     // ... game update ...
//!     queue.run_pending();
//! }
//! ```
//!
//! A job that panics is logged and counted; the rest of the batch still
//! runs and the panic never reaches the thread that submitted the job.

mod driver;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, error, trace, warn};

pub use driver::{FrameDriver, FrameDriverConfig};

/// A deferred call destined for the game thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`GameThreadQueue`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on jobs run per [`GameThreadQueue::run_pending`] call.
    /// `None` runs every job queued before the call. Jobs over the cap stay
    /// queued, in order, for the next frame.
    pub max_jobs_per_tick: Option<usize>,
    /// Queue length at which a warning is logged on submit. 0 disables it.
    pub backlog_warn_threshold: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_tick: None,
            backlog_warn_threshold: 1_024,
        }
    }
}

impl DispatchConfig {
    /// Fix out-of-range values. A cap of 0 would starve the queue forever,
    /// so it is raised to 1.
    pub fn validated(mut self) -> Self {
        if self.max_jobs_per_tick == Some(0) {
            warn!("max_jobs_per_tick of 0 would never drain: using 1");
            self.max_jobs_per_tick = Some(1);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters accumulated across [`GameThreadQueue::run_pending`] calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchMetrics {
    /// `run_pending` calls, including ones that found nothing.
    pub total_ticks: u64,
    pub total_jobs_run: u64,
    /// Jobs that panicked.
    pub total_panics: u64,
    /// Largest batch run in a single call.
    pub max_batch: usize,
    /// Jobs dropped because the queue was closed.
    pub total_dropped: u64,
}

/// What a single [`GameThreadQueue::run_pending`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub ran: usize,
    pub panicked: usize,
    /// Jobs still queued afterwards.
    pub remaining: usize,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

struct Shared {
    jobs: Mutex<VecDeque<Job>>,
    /// Fast-path flag so an idle frame does not touch the lock.
    empty: AtomicBool,
    closed: AtomicBool,
    backlog_warn_threshold: usize,
    dropped: AtomicU64,
}

/// Cloneable submit side of a [`GameThreadQueue`]. `Send + Sync`.
#[derive(Clone)]
pub struct DispatchHandle {
    shared: Arc<Shared>,
}

impl DispatchHandle {
    /// Queues `job` to run on the next [`GameThreadQueue::run_pending`].
    ///
    /// Never blocks on the game thread. Dropped silently (and counted) if
    /// the queue was closed.
    pub fn run_on_game_thread(&self, job: impl FnOnce() + Send + 'static) {
        if self.shared.closed.load(Ordering::Acquire) {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("dispatch queue closed, dropping job");
            return;
        }

        let len = {
            let mut jobs = self.shared.jobs.lock();
            jobs.push_back(Box::new(job));
            self.shared.empty.store(false, Ordering::Release);
            jobs.len()
        };

        let threshold = self.shared.backlog_warn_threshold;
        if threshold > 0 && len == threshold {
            warn!(
                queued = len,
                "game-thread queue backlog: is run_pending being called?"
            );
        }
    }

    /// Returns `true` once the owning queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// FIFO queue of jobs consumed on the game thread.
pub struct GameThreadQueue {
    shared: Arc<Shared>,
    max_jobs_per_tick: Option<usize>,
    metrics: Mutex<DispatchMetrics>,
}

impl GameThreadQueue {
    pub fn new(config: DispatchConfig) -> Self {
        let config = config.validated();
        debug!(
            max_jobs_per_tick = ?config.max_jobs_per_tick,
            "game-thread queue created"
        );
        Self {
            shared: Arc::new(Shared {
                jobs: Mutex::new(VecDeque::new()),
                empty: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                backlog_warn_threshold: config.backlog_warn_threshold,
                dropped: AtomicU64::new(0),
            }),
            max_jobs_per_tick: config.max_jobs_per_tick,
            metrics: Mutex::new(DispatchMetrics::default()),
        }
    }

    /// A submit handle for producers on other threads.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs the jobs queued so far, oldest first. Call once per frame on
    /// the game thread.
    ///
    /// Jobs submitted while this runs (including by the jobs themselves)
    /// wait for the next call, so one frame's work is bounded.
    pub fn run_pending(&self) -> DrainReport {
        let batch = if self.shared.empty.load(Ordering::Acquire) {
            VecDeque::new()
        } else {
            let mut jobs = self.shared.jobs.lock();
            let batch = match self.max_jobs_per_tick {
                Some(cap) if jobs.len() > cap => {
                    let rest = jobs.split_off(cap);
                    std::mem::replace(&mut *jobs, rest)
                }
                _ => std::mem::take(&mut *jobs),
            };
            self.shared.empty.store(jobs.is_empty(), Ordering::Release);
            batch
        };

        let mut report = DrainReport::default();
        for job in batch {
            report.ran += 1;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                report.panicked += 1;
                error!(
                    panic = panic_message(payload.as_ref()),
                    "game-thread job panicked"
                );
            }
        }
        report.remaining = self.len();

        let mut metrics = self.metrics.lock();
        metrics.total_ticks += 1;
        metrics.total_jobs_run += report.ran as u64;
        metrics.total_panics += report.panicked as u64;
        metrics.max_batch = metrics.max_batch.max(report.ran);

        if report.ran > 0 {
            trace!(ran = report.ran, remaining = report.remaining, "game-thread jobs ran");
        }
        report
    }

    /// Jobs currently waiting.
    pub fn len(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.empty.load(Ordering::Acquire)
    }

    /// Stops accepting jobs and discards the ones still queued. Used when
    /// there is no game loop to run them.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let discarded = {
            let mut jobs = self.shared.jobs.lock();
            let n = jobs.len();
            jobs.clear();
            self.shared.empty.store(true, Ordering::Release);
            n
        };
        self.shared.dropped.fetch_add(discarded as u64, Ordering::Relaxed);
        debug!(discarded, "game-thread queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> DispatchMetrics {
        let mut metrics = self.metrics.lock().clone();
        metrics.total_dropped = self.shared.dropped.load(Ordering::Relaxed);
        metrics
    }
}

impl Default for GameThreadQueue {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
