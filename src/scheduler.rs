//! Data-parallel, order-preserving work scheduling and progress reporting.
//!
//! [`WorkerPool`] is owned by the caller and handed to the codecs; nothing
//! here is process-global. Work units are independent, so the only shared
//! state between workers is the [`Progress`] counter.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, StegoError};

/// Progress sink: receives a fraction in `[0, 1]`.
pub type ProgressSink<'a> = dyn Fn(f64) + Sync + 'a;

/// Share of the bar covered by worker units; the rest is reserved for
/// the final write so 1.0 only appears once the operation is complete.
const WORK_SHARE: f64 = 0.95;

/// Bounded worker pool for per-block and per-chunk transforms.
pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Creates a pool with `threads` workers (0 = one per CPU).
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("stego-worker-{i}"))
            .build()
            .map_err(|e| StegoError::WorkerPool(e.to_string()))?;

        debug!("Worker pool started with {} threads", threads);
        Ok(Self { pool, threads })
    }

    /// Creates a pool sized to the available CPUs.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(0)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Applies `f` to every item in parallel.
    ///
    /// Results are returned in submission order regardless of the order in
    /// which workers finish. Each completed unit advances `progress`.
    pub fn map_ordered<T, R, F>(&self, items: Vec<T>, progress: &Progress<'_>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let result = f(item);
                    progress.advance();
                    result
                })
                .collect()
        })
    }
}

/// Progress of a single hide/extract call.
pub struct Progress<'a> {
    sink: Option<&'a ProgressSink<'a>>,
    done: AtomicUsize,
    total: AtomicUsize,
    /// Last fraction handed to the sink. Held while the sink runs so that
    /// reports can never arrive out of order.
    reported: Mutex<f64>,
}

impl<'a> Progress<'a> {
    /// Returns a tracker that reports to `sink`, if any.
    pub fn new(sink: Option<&'a ProgressSink<'a>>) -> Self {
        Self {
            sink,
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            reported: Mutex::new(0.0),
        }
    }

    /// Progress that reports nowhere.
    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Sets the number of work units and restarts the unit count.
    pub fn set_total(&self, total: usize) {
        self.done.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Marks one work unit as complete.
    ///
    /// Never blocks: if another thread is currently reporting, this update
    /// is folded into the next one.
    pub fn advance(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);

        let Some(sink) = self.sink else { return };
        let Some(mut reported) = self.reported.try_lock() else {
            return;
        };

        let fraction = self.fraction();
        if fraction > *reported {
            *reported = fraction;
            sink(fraction);
        }
    }

    /// Reports completion. Emits 1.0 exactly once.
    pub fn finish(&self) {
        let Some(sink) = self.sink else { return };
        let mut reported = self.reported.lock();
        if *reported < 1.0 {
            *reported = 1.0;
            sink(1.0);
        }
    }

    /// Current fraction of the work share, excluding the final step.
    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let done = self.done.load(Ordering::Relaxed).min(total);
        done as f64 / total as f64 * WORK_SHARE
    }
}
