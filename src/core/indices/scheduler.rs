//! Bounded parallelism across independent cohort runs

use crate::core::error::{AnalyticsError, AnalyticsResult};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Runs independent tasks (one per program, one per generation) on a fixed
/// number of worker threads.
///
/// Results come back in input order regardless of completion order.
pub struct BatchScheduler {
    pool: ThreadPool,
    workers: usize,
}

impl BatchScheduler {
    /// Build a scheduler with `workers` threads (at least one)
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::Scheduler`] if the thread pool cannot be created.
    pub fn new(workers: usize) -> AnalyticsResult<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cohort-worker-{i}"))
            .build()
            .map_err(|e| AnalyticsError::Scheduler(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    /// Number of worker threads
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `task` to every input in parallel, keeping input order
    pub fn map<T, R, F>(&self, inputs: Vec<T>, task: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        self.pool
            .install(|| inputs.into_par_iter().map(task).collect())
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn preserves_input_order() {
        let scheduler = BatchScheduler::new(4).expect("pool");
        let out = scheduler.map((0..32u64).collect(), |n| {
            // Later inputs finish first
            thread::sleep(Duration::from_millis(32 - n));
            n * 2
        });
        assert_eq!(out, (0..32u64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn never_exceeds_worker_count() {
        let scheduler = BatchScheduler::new(2).expect("pool");
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        scheduler.map((0..16).collect::<Vec<u32>>(), |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            running.fetch_sub(1, Ordering::SeqCst);
        });
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(BatchScheduler::new(0).expect("pool").workers(), 1);
    }
}
