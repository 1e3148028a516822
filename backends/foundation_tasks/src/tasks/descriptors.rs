#![allow(clippy::type_complexity)]

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::cell::{CellError, ValueCell};
use crate::ident::Tag;
use crate::queues::WorkQueue;
use crate::runners::RunnerScope;

use super::failure::Failure;
use super::frames::{
    ConditionalFrame, InterceptFrame, LoopFrame, RepeatFrame, SequenceFrame, SimpleFrame,
};
use super::stack::ContextStack;

/// Clones the value held by a cell. Monomorphized by the factory, stored
/// as a plain function pointer so descriptors stay unparameterized.
pub(crate) type CellCloner = fn(&ValueCell) -> Result<ValueCell, CellError>;

pub(crate) fn clone_slot<T: Clone + Send + 'static>(
    cell: &ValueCell,
) -> Result<ValueCell, CellError> {
    Ok(ValueCell::of(cell.peek::<T>()?.clone()))
}

pub(crate) fn default_slot<R: Default + Send + 'static>() -> ValueCell {
    ValueCell::of(R::default())
}

/// [`Descriptor`] is the immutable static description of a task: what to
/// run, on which runner, with which children. Descriptor trees are built
/// by the factory, shared through `Arc` and never mutated afterwards.
pub(crate) trait Descriptor: Send + Sync + 'static {
    fn tag(&self) -> &Tag;

    /// Queue of the first simple subtask that will run, used as the
    /// pre-submission scheduling hint. Compounds recurse into the child
    /// that starts execution. `None` when that runner is gone.
    fn first_queue(&self) -> Option<Arc<WorkQueue>>;

    /// Creates this descriptor's execution frame for one invocation and
    /// pushes it onto the stack.
    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell);

    /// Ordered child list when this descriptor is a sequence; lets the
    /// builder extend a chain without re-nesting.
    fn stage_list(&self) -> Option<&[Arc<dyn Descriptor>]> {
        None
    }

    /// Try-child and handler arms when this descriptor is an intercept.
    fn intercept_parts(&self) -> Option<(&Arc<dyn Descriptor>, &[HandlerArm])> {
        None
    }
}

// ---- simple

pub(crate) struct SimpleDescriptor<S, I, R, F> {
    tag: Tag,
    pub(crate) runner: Weak<S>,
    pub(crate) call: F,
    _types: PhantomData<fn(I) -> R>,
}

impl<S, I, R, F> SimpleDescriptor<S, I, R, F>
where
    S: RunnerScope,
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(&Arc<S>, I) -> R + Send + Sync + 'static,
{
    pub(crate) fn new(runner: Weak<S>, call: F) -> Self {
        Self {
            tag: Tag::scoped("task"),
            runner,
            call,
            _types: PhantomData,
        }
    }
}

impl<S, I, R, F> Descriptor for SimpleDescriptor<S, I, R, F>
where
    S: RunnerScope,
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(&Arc<S>, I) -> R + Send + Sync + 'static,
{
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.runner
            .upgrade()
            .map(|scope| Arc::clone(scope.runner().queue()))
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(SimpleFrame::new(self, input)));
    }
}

// ---- sequence

pub(crate) struct SequenceDescriptor {
    tag: Tag,
    pub(crate) stages: Vec<Arc<dyn Descriptor>>,
}

impl SequenceDescriptor {
    pub(crate) fn new(stages: Vec<Arc<dyn Descriptor>>) -> Self {
        debug_assert!(stages.len() >= 2);
        Self {
            tag: Tag::scoped("task"),
            stages,
        }
    }
}

impl Descriptor for SequenceDescriptor {
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.stages.first().and_then(|stage| stage.first_queue())
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(SequenceFrame::new(self, input)));
    }

    fn stage_list(&self) -> Option<&[Arc<dyn Descriptor>]> {
        Some(&self.stages)
    }
}

// ---- conditional

pub(crate) struct ConditionalDescriptor {
    tag: Tag,
    pub(crate) predicate: Arc<dyn Descriptor>,
    pub(crate) on_true: Arc<dyn Descriptor>,
    pub(crate) on_false: Option<Arc<dyn Descriptor>>,
    pub(crate) cloner: CellCloner,
}

impl ConditionalDescriptor {
    pub(crate) fn new(
        predicate: Arc<dyn Descriptor>,
        on_true: Arc<dyn Descriptor>,
        on_false: Option<Arc<dyn Descriptor>>,
        cloner: CellCloner,
    ) -> Self {
        Self {
            tag: Tag::scoped("task"),
            predicate,
            on_true,
            on_false,
            cloner,
        }
    }
}

impl Descriptor for ConditionalDescriptor {
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.predicate.first_queue()
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(ConditionalFrame::new(self, input)));
    }
}

// ---- loop

pub(crate) struct LoopDescriptor {
    tag: Tag,
    pub(crate) predicate: Arc<dyn Descriptor>,
    pub(crate) body: Option<Arc<dyn Descriptor>>,
    pub(crate) cloner: CellCloner,
}

impl LoopDescriptor {
    pub(crate) fn new(
        predicate: Arc<dyn Descriptor>,
        body: Option<Arc<dyn Descriptor>>,
        cloner: CellCloner,
    ) -> Self {
        Self {
            tag: Tag::scoped("task"),
            predicate,
            body,
            cloner,
        }
    }
}

impl Descriptor for LoopDescriptor {
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.predicate.first_queue()
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(LoopFrame::new(self, input)));
    }
}

// ---- repeat

pub(crate) struct RepeatDescriptor {
    tag: Tag,
    pub(crate) body: Arc<dyn Descriptor>,
    pub(crate) default_result: fn() -> ValueCell,
}

impl RepeatDescriptor {
    pub(crate) fn new(body: Arc<dyn Descriptor>, default_result: fn() -> ValueCell) -> Self {
        Self {
            tag: Tag::scoped("task"),
            body,
            default_result,
        }
    }
}

impl Descriptor for RepeatDescriptor {
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.body.first_queue()
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(RepeatFrame::new(self, input)));
    }
}

// ---- intercept

/// One handler of an intercept: the handler task plus the two
/// monomorphized probes deciding whether a fault matches the handler's
/// input type and converting the fault into that input.
#[derive(Clone)]
pub(crate) struct HandlerArm {
    pub(crate) task: Arc<dyn Descriptor>,
    pub(crate) accepts: fn(&Failure) -> bool,
    pub(crate) bind: fn(Failure) -> ValueCell,
}

pub(crate) fn accepts_typed<E: 'static>(failure: &Failure) -> bool {
    failure.is::<E>()
}

pub(crate) fn bind_typed<E: Send + 'static>(failure: Failure) -> ValueCell {
    match failure.downcast::<E>() {
        Ok(payload) => ValueCell::of(payload),
        // unreachable behind a matching `accepts`; surfaces downstream
        // as a conversion fault instead of tearing the run down.
        Err(other) => ValueCell::of(other),
    }
}

pub(crate) fn accepts_any(_failure: &Failure) -> bool {
    true
}

pub(crate) fn bind_any(failure: Failure) -> ValueCell {
    ValueCell::of(failure)
}

pub(crate) struct InterceptDescriptor {
    tag: Tag,
    pub(crate) attempt: Arc<dyn Descriptor>,
    pub(crate) handlers: Vec<HandlerArm>,
}

impl InterceptDescriptor {
    pub(crate) fn new(attempt: Arc<dyn Descriptor>, handlers: Vec<HandlerArm>) -> Self {
        debug_assert!(!handlers.is_empty());
        Self {
            tag: Tag::scoped("task"),
            attempt,
            handlers,
        }
    }
}

impl Descriptor for InterceptDescriptor {
    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn first_queue(&self) -> Option<Arc<WorkQueue>> {
        self.attempt.first_queue()
    }

    fn instantiate(self: Arc<Self>, stack: &mut ContextStack, input: ValueCell) {
        stack.push(Box::new(InterceptFrame::new(self, input)));
    }

    fn intercept_parts(&self) -> Option<(&Arc<dyn Descriptor>, &[HandlerArm])> {
        Some((&self.attempt, &self.handlers))
    }
}
