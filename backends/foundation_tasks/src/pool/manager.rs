use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use std::{env, thread};

use concurrent_queue::{ConcurrentQueue, PopError};

use crate::errors::TaskError;
use crate::synca::{OnSignal, WakeLatch};
use crate::types::TaskResult;

/// One unit of work handed to the pool by a work queue.
pub(crate) type PoolJob = Box<dyn FnOnce() + Send + 'static>;

/// Environment variable overriding the number of pool worker threads.
pub const NUM_THREADS_VAR: &str = "FOUNDATION_TASKS_NUM_THREADS";

/// The process-wide pool instance. Held weakly so the pool worker threads
/// go away once the last runner referencing the pool is gone, and a later
/// runner construction boots a fresh pool.
static SHARED_POOL: Mutex<Weak<PoolManager>> = Mutex::new(Weak::new());

/// [`get_max_threads`] returns the parallelism the platform reports for
/// the current process.
pub(crate) fn get_max_threads() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// [`get_num_threads`] resolves the desired worker thread count from the
/// `FOUNDATION_TASKS_NUM_THREADS` environment variable, falling back to
/// the platform parallelism. The count never drops below 2: one task
/// sleeping on a worker must not be able to starve every other runner.
pub(crate) fn get_num_threads() -> usize {
    let desired = match env::var(NUM_THREADS_VAR)
        .ok()
        .and_then(|value| usize::from_str(&value).ok())
    {
        Some(count) if count > 0 => {
            tracing::debug!(
                count,
                "using worker thread count from {}",
                NUM_THREADS_VAR
            );
            count
        }
        _ => get_max_threads(),
    };

    desired.max(2)
}

/// [`PoolManager`] owns the worker threads every work queue dispatches
/// into. One instance exists per process while at least one runner is
/// alive; the instance is shared through [`PoolManager::shared`].
///
/// Workers pull jobs from a single FIFO injector queue, so jobs start in
/// submission order, and park on a [`WakeLatch`] when the injector runs
/// dry. Dropping the last reference signals the workers to finish.
pub struct PoolManager {
    injector: Arc<ConcurrentQueue<PoolJob>>,
    latch: Arc<WakeLatch>,
    shutdown: Arc<OnSignal>,
    workers: usize,
}

impl PoolManager {
    /// `shared` returns the live process-wide pool, booting one when none
    /// exists. Fails with [`TaskError::CreateFailure`] when the platform
    /// refuses to spawn the worker threads.
    pub fn shared() -> TaskResult<Arc<Self>> {
        let mut slot = SHARED_POOL.lock().unwrap();
        if let Some(existing) = slot.upgrade() {
            return Ok(existing);
        }

        let fresh = Self::boot()?;
        *slot = Arc::downgrade(&fresh);
        Ok(fresh)
    }

    fn boot() -> TaskResult<Arc<Self>> {
        let injector = Arc::new(ConcurrentQueue::unbounded());
        let latch = Arc::new(WakeLatch::new());
        let shutdown = Arc::new(OnSignal::new());
        let workers = get_num_threads();

        tracing::debug!(workers, "booting worker pool");

        for index in 0..workers {
            let injector = Arc::clone(&injector);
            let latch = Arc::clone(&latch);
            let shutdown = Arc::clone(&shutdown);

            thread::Builder::new()
                .name(format!("task-pool-{index}"))
                .spawn(move || worker_loop(index, &injector, &latch, &shutdown))
                .map_err(|err| TaskError::CreateFailure(Box::new(err)))?;
        }

        Ok(Arc::new(Self {
            injector,
            latch,
            shutdown,
            workers,
        }))
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// `submit` hands one job to the worker threads. Non-blocking.
    pub(crate) fn submit(&self, job: PoolJob) {
        if self.injector.push(job).is_err() {
            // only reachable when the pool is tearing down underneath a
            // queue that still holds it; the job is dropped.
            tracing::error!("worker pool refused a job");
            return;
        }
        self.latch.wake_all();
    }
}

impl Drop for PoolManager {
    fn drop(&mut self) {
        tracing::debug!("worker pool shutting down");
        self.shutdown.turn_on();
        self.injector.close();
        self.latch.wake_all();
    }
}

fn worker_loop(
    index: usize,
    injector: &ConcurrentQueue<PoolJob>,
    latch: &WakeLatch,
    shutdown: &OnSignal,
) {
    tracing::debug!(index, "pool worker started");
    loop {
        let ticket = latch.ticket();
        match injector.pop() {
            Ok(job) => {
                // a panic escaping a job was already captured and delivered
                // to the task runtime; the worker thread must survive it.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::debug!(index, "pool worker absorbed a panic");
                }
            }
            Err(PopError::Empty) => {
                if shutdown.probe() {
                    break;
                }
                latch.wait_past(ticket);
            }
            Err(PopError::Closed) => break,
        }
    }
    tracing::debug!(index, "pool worker stopped");
}
