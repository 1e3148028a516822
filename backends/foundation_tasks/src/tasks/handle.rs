use std::marker::PhantomData;
use std::sync::Arc;

use crate::cell::ValueCell;

use super::descriptors::{Descriptor, SequenceDescriptor};
use super::driver;
use super::stack::ContextStack;

/// Marker types describing what a task handle is, carried as the third
/// phantom parameter of [`Task`].
pub mod kinds {
    /// Implemented by every task kind marker.
    pub trait Kind: Send + Sync + 'static {
        /// Whether a run of this kind can use the single-slot stack
        /// shape; true only for bare simple tasks, which never descend.
        const SOLO: bool = false;
    }

    pub struct Simple;
    impl Kind for Simple {
        const SOLO: bool = true;
    }

    pub struct Sequence;
    impl Kind for Sequence {}

    pub struct Conditional;
    impl Kind for Conditional {}

    pub struct Loop;
    impl Kind for Loop {}

    pub struct Repeat;
    impl Kind for Repeat {}

    pub struct Intercept;
    impl Kind for Intercept {}
}

/// [`Task`] is a cheap, clonable handle to an immutable task descriptor
/// tree, statically typed over its input `I`, its result `R` and its
/// kind `K`.
///
/// Handles are assembled by the factory functions in
/// [`crate::tasks`]; the typing rules of the composition are enforced by
/// those signatures, so a handle that exists is well-typed. Running a
/// handle is fire-and-forget: results are observed through the side
/// effects of the tasks themselves or by composing an intercept frame
/// over the graph.
pub struct Task<I, R, K> {
    pub(crate) descriptor: Arc<dyn Descriptor>,
    _types: PhantomData<fn(I) -> (R, K)>,
}

impl<I, R, K> Clone for Task<I, R, K> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            _types: PhantomData,
        }
    }
}

impl<I, R, K> core::fmt::Debug for Task<I, R, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name()).finish()
    }
}

impl<I, R, K> Task<I, R, K> {
    pub(crate) fn from_descriptor(descriptor: Arc<dyn Descriptor>) -> Self {
        Self {
            descriptor,
            _types: PhantomData,
        }
    }

    /// `name` is the process-unique `task-N` diagnostic name of the
    /// underlying descriptor.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.tag().label()
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.descriptor.tag().id()
    }
}

impl<I, R, K> Task<I, R, K>
where
    I: Send + 'static,
    R: Send + 'static,
    K: kinds::Kind,
{
    /// `run` launches one invocation of the task graph with the provided
    /// input. Returns immediately; the graph executes on the runners its
    /// simple tasks are bound to.
    pub fn run(&self, input: I) {
        let mut stack = ContextStack::fresh(K::SOLO);
        Arc::clone(&self.descriptor).instantiate(&mut stack, ValueCell::of(input));
        tracing::trace!(task = self.name(), "run kick-started");
        driver::kickstart(stack);
    }

    /// `then` appends a stage after this task, producing a sequence that
    /// feeds this task's result into `next`. Appending to a task that is
    /// already a sequence extends its stage list in place of nesting.
    #[must_use]
    pub fn then<NR, KN>(self, next: Task<R, NR, KN>) -> Task<I, NR, kinds::Sequence>
    where
        NR: Send + 'static,
        KN: kinds::Kind,
    {
        let stages = match self.descriptor.stage_list() {
            Some(list) => {
                let mut stages = list.to_vec();
                stages.push(next.descriptor);
                stages
            }
            None => vec![self.descriptor, next.descriptor],
        };
        Task::from_descriptor(Arc::new(SequenceDescriptor::new(stages)))
    }
}

impl<R, K> Task<(), R, K>
where
    R: Send + 'static,
    K: kinds::Kind,
{
    /// `launch` runs a task that takes no input.
    pub fn launch(&self) {
        self.run(());
    }
}
