use std::sync::Arc;

use crate::ident::Tag;
use crate::queues::{WorkItem, WorkQueue};
use crate::types::TaskResult;

/// Scheduling policy of a [`Runner`].
///
/// A sequential runner executes the items of its queue one after another;
/// a concurrent runner lets the worker pool overlap them. The policy is
/// indicative for the concurrent case, since there is no guarantee an
/// idle worker is available, but a sequential runner will never overlap
/// two items.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RunPolicy {
    #[default]
    Sequential,
    Concurrent,
}

struct RunnerInner {
    tag: Tag,
    queue: Arc<WorkQueue>,
}

impl Drop for RunnerInner {
    fn drop(&mut self) {
        // last logical clone gone; the queue drains and self-destructs.
        self.queue.release();
    }
}

/// [`Runner`] is a named handle to an execution queue.
///
/// Cloning a runner produces a logical clone: both handles share the same
/// queue and the same identity. Dropping the last clone releases the
/// queue, which executes its remaining items and then destroys itself.
///
/// A runner is created started and immediately capable of executing
/// work. All methods are safe to call from any thread.
#[derive(Clone)]
pub struct Runner {
    inner: Arc<RunnerInner>,
}

impl Runner {
    /// `new` builds a sequential runner.
    pub fn new() -> TaskResult<Self> {
        Self::with_policy(RunPolicy::Sequential)
    }

    /// `with_policy` builds a runner with the requested scheduling
    /// policy. Fails with [`crate::errors::TaskError::CreateFailure`]
    /// when the worker pool cannot be initialized.
    pub fn with_policy(policy: RunPolicy) -> TaskResult<Self> {
        let queue = WorkQueue::create(policy)?;
        let tag = Tag::scoped("runner");
        tracing::debug!(runner = %tag, queue = queue.name(), "runner created");
        Ok(Self {
            inner: Arc::new(RunnerInner { tag, queue }),
        })
    }

    /// `submit` hands one unit of work to the runner's queue. Returns
    /// immediately; the work executes on a pool worker thread.
    pub fn submit<F: FnOnce() + Send + 'static>(&self, work: F) {
        self.inner.queue.enqueue(WorkItem::new(work));
    }

    /// `start` resumes execution of queued items.
    pub fn start(&self) {
        self.inner.queue.start();
    }

    /// `stop` suspends dispatch. The item currently executing runs to
    /// completion; queued items wait until `start`.
    pub fn stop(&self) {
        self.inner.queue.stop();
    }

    /// `release` consumes this handle. When it was the last clone the
    /// queue executes its remaining items, even on a stopped runner,
    /// and then destroys itself.
    pub fn release(self) {
        drop(self);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.tag.label()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.tag.id()
    }

    #[must_use]
    pub fn policy(&self) -> RunPolicy {
        self.inner.queue.policy()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.queue.is_active()
    }

    pub(crate) fn queue(&self) -> &Arc<WorkQueue> {
        &self.inner.queue
    }
}

impl core::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("name", &self.name())
            .field("policy", &self.policy())
            .finish()
    }
}

/// [`RunnerScope`] is the seam for user runner subtypes.
///
/// A simple task is statically parameterized over the concrete scope and
/// its callable receives a shared reference to it, so a scope can carry
/// whatever state its tasks need alongside the runner that executes
/// them:
///
/// ```
/// use std::sync::atomic::AtomicUsize;
/// use foundation_tasks::runners::{Runner, RunnerScope};
///
/// struct CounterScope {
///     runner: Runner,
///     hits: AtomicUsize,
/// }
///
/// impl RunnerScope for CounterScope {
///     fn runner(&self) -> &Runner {
///         &self.runner
///     }
/// }
/// ```
pub trait RunnerScope: Send + Sync + 'static {
    fn runner(&self) -> &Runner;
}

impl RunnerScope for Runner {
    fn runner(&self) -> &Runner {
        self
    }
}
