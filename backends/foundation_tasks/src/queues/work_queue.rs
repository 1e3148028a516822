use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ident::Tag;
use crate::pool::PoolManager;
use crate::runners::RunPolicy;
use crate::types::TaskResult;

/// Status word bits. `BUSY` gates sequential queues to one in-flight item;
/// `RELEASED` marks a queue that is draining towards destruction.
const BUSY: usize = 0x01;
const ACTIVE: usize = 0x02;
const EMPTY: usize = 0x04;
const RELEASED: usize = 0x08;

/// [`WorkItem`] is one opaque unit of work: the executor, its data and
/// its cleanup folded into a single owned closure.
pub struct WorkItem {
    job: Box<dyn FnOnce() + Send + 'static>,
}

impl WorkItem {
    pub fn new<F: FnOnce() + Send + 'static>(job: F) -> Self {
        Self { job: Box::new(job) }
    }

    pub(crate) fn run(self) {
        (self.job)();
    }
}

/// [`WorkQueue`] is the named FIFO behind a runner.
///
/// A sequential queue executes at most one item at any instant, in
/// enqueue order; the edge-triggered [`WorkQueue::check_submit_next`]
/// keeps exactly one submission in flight to the worker pool whenever the
/// queue is non-empty, active and not busy. A concurrent queue forwards
/// every item straight to the pool, so items start in enqueue order but
/// may overlap.
pub struct WorkQueue {
    tag: Tag,
    policy: RunPolicy,
    status: AtomicUsize,
    items: Mutex<VecDeque<WorkItem>>,
    pool: Arc<PoolManager>,
}

impl WorkQueue {
    /// `create` builds a queue in the empty, active state on the shared
    /// worker pool.
    pub(crate) fn create(policy: RunPolicy) -> TaskResult<Arc<Self>> {
        let pool = PoolManager::shared()?;
        let queue = Arc::new(Self {
            tag: Tag::scoped("queue"),
            policy,
            status: AtomicUsize::new(EMPTY | ACTIVE),
            items: Mutex::new(VecDeque::new()),
            pool,
        });
        tracing::debug!(queue = %queue.tag, ?policy, "work queue created");
        Ok(queue)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.tag.label()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.tag.id()
    }

    #[must_use]
    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.load(Ordering::Acquire) & ACTIVE != 0
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.status.load(Ordering::Acquire) & RELEASED != 0
    }

    /// `enqueue` appends one item. Non-blocking. Items offered to a
    /// released queue are refused and dropped.
    pub fn enqueue(self: &Arc<Self>, item: WorkItem) {
        if self.is_released() {
            tracing::debug!(queue = %self.tag, "item refused, queue already released");
            return;
        }

        if self.policy == RunPolicy::Concurrent && self.is_active() {
            self.forward(item);
            return;
        }

        {
            let mut items = self.items.lock().unwrap();
            items.push_back(item);
            self.status.fetch_and(!EMPTY, Ordering::AcqRel);
        }
        self.check_submit_next();
    }

    /// `start` transitions stopped to started; pending items resume.
    pub fn start(self: &Arc<Self>) {
        self.status.fetch_or(ACTIVE, Ordering::AcqRel);
        tracing::debug!(queue = %self.tag, "work queue started");
        if self.policy == RunPolicy::Concurrent {
            self.drain_to_pool();
        } else {
            self.check_submit_next();
        }
    }

    /// `stop` transitions started to stopped. The item currently in
    /// flight completes; queued items wait for `start`. A released queue
    /// stays active so it can drain.
    pub fn stop(&self) {
        if self.is_released() {
            tracing::debug!(queue = %self.tag, "stop ignored, queue is draining");
            return;
        }
        self.status.fetch_and(!ACTIVE, Ordering::AcqRel);
        tracing::debug!(queue = %self.tag, "work queue stopped");
    }

    /// `release` marks the queue for destruction. A released queue is
    /// forced active so remaining items drain even when it was stopped;
    /// it goes away when the drain ends and the last reference drops.
    pub(crate) fn release(self: &Arc<Self>) {
        let previous = self.status.fetch_or(RELEASED | ACTIVE, Ordering::AcqRel);
        if previous & RELEASED == 0 {
            tracing::debug!(queue = %self.tag, "work queue released, draining");
            if self.policy == RunPolicy::Concurrent {
                self.drain_to_pool();
            } else {
                self.check_submit_next();
            }
        }
    }

    /// `forward` hands one item straight to the pool, bypassing the
    /// serialization gate. Concurrent policy only.
    fn forward(self: &Arc<Self>, item: WorkItem) {
        let queue = Arc::clone(self);
        self.pool.submit(Box::new(move || {
            if panic::catch_unwind(AssertUnwindSafe(|| item.run())).is_err() {
                tracing::debug!(queue = %queue.tag, "item panic absorbed");
            }
        }));
    }

    /// `drain_to_pool` flushes every held item to the pool in enqueue
    /// order, used when a concurrent queue starts or releases.
    fn drain_to_pool(self: &Arc<Self>) {
        loop {
            let item = {
                let mut items = self.items.lock().unwrap();
                let item = items.pop_front();
                if items.is_empty() {
                    self.status.fetch_or(EMPTY, Ordering::AcqRel);
                }
                item
            };
            match item {
                Some(item) => self.forward(item),
                None => return,
            }
        }
    }

    /// `check_submit_next` is the edge trigger keeping one submission in
    /// flight: it atomically moves `{not empty, active, not busy}` to
    /// `{not empty, active, busy}` (with or without the released bit) and
    /// on success hands the front item to the pool.
    fn check_submit_next(self: &Arc<Self>) {
        loop {
            let current = self.status.load(Ordering::Acquire);
            if current & (EMPTY | BUSY) != 0 || current & ACTIVE == 0 {
                return;
            }
            if self
                .status
                .compare_exchange(current, current | BUSY, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }

        let item = {
            let mut items = self.items.lock().unwrap();
            let item = items.pop_front();
            if items.is_empty() {
                self.status.fetch_or(EMPTY, Ordering::AcqRel);
            }
            item
        };

        let Some(item) = item else {
            // the status word said non-empty; the transition table does
            // not produce this state.
            tracing::error!(queue = %self.tag, "unexpected atomic state, empty list behind a non-empty status");
            self.status.fetch_and(!BUSY, Ordering::AcqRel);
            return;
        };

        let queue = Arc::clone(self);
        self.pool.submit(Box::new(move || {
            if panic::catch_unwind(AssertUnwindSafe(|| item.run())).is_err() {
                // already captured and delivered by the task runtime.
                tracing::debug!(queue = %queue.tag, "item panic absorbed");
            }
            queue.status.fetch_and(!BUSY, Ordering::AcqRel);
            queue.check_submit_next();
        }));
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        tracing::debug!(queue = %self.tag, "work queue destroyed");
    }
}
