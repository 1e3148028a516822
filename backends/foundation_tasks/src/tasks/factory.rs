//! Pure constructors assembling typed task trees.
//!
//! The typing rules of the composition are carried entirely by the
//! function signatures here (a stage's result is the next stage's
//! input, predicates produce `bool` over the shared input, and so on),
//! so an ill-typed composition does not construct.

use std::sync::Arc;

use crate::runners::RunnerScope;

use super::descriptors::{
    accepts_any, accepts_typed, bind_any, bind_typed, clone_slot, default_slot,
    ConditionalDescriptor, Descriptor, HandlerArm, InterceptDescriptor, LoopDescriptor,
    RepeatDescriptor, SequenceDescriptor, SimpleDescriptor,
};
use super::failure::Failure;
use super::handle::{kinds, Task};

/// `simple` binds a user callable to a runner scope. The callable runs
/// to completion on one pool worker thread and receives a shared
/// reference to the scope alongside the task input.
///
/// The scope is held weakly: running the task after the scope was
/// dropped delivers a [`crate::errors::TaskError::RunnerUnavailable`]
/// fault instead of invoking the callable.
pub fn simple<S, I, R, F>(scope: &Arc<S>, call: F) -> Task<I, R, kinds::Simple>
where
    S: RunnerScope,
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(&Arc<S>, I) -> R + Send + Sync + 'static,
{
    Task::from_descriptor(Arc::new(SimpleDescriptor::new(Arc::downgrade(scope), call)))
}

/// `getter` is the ergonomic alias for a no-input simple task reading a
/// value off its scope.
pub fn getter<S, V, F>(scope: &Arc<S>, read: F) -> Task<(), V, kinds::Simple>
where
    S: RunnerScope,
    V: Send + 'static,
    F: Fn(&Arc<S>) -> V + Send + Sync + 'static,
{
    simple(scope, move |scope, ()| read(scope))
}

/// `mutator` is the ergonomic alias for a simple task writing a value
/// into its scope.
pub fn mutator<S, V, F>(scope: &Arc<S>, write: F) -> Task<V, (), kinds::Simple>
where
    S: RunnerScope,
    V: Send + 'static,
    F: Fn(&Arc<S>, V) + Send + Sync + 'static,
{
    simple(scope, move |scope, value| write(scope, value))
}

/// `sequence` chains two tasks, feeding the first task's result into
/// the second. Longer chains are built with [`Task::then`], which keeps
/// the stage list flat.
pub fn sequence<I, M, R, KA, KB>(
    first: Task<I, M, KA>,
    second: Task<M, R, KB>,
) -> Task<I, R, kinds::Sequence>
where
    I: Send + 'static,
    M: Send + 'static,
    R: Send + 'static,
    KA: kinds::Kind,
    KB: kinds::Kind,
{
    Task::from_descriptor(Arc::new(SequenceDescriptor::new(vec![
        first.descriptor,
        second.descriptor,
    ])))
}

/// `conditional` runs the predicate with a clone of the input, then
/// exactly one of the branches with the input itself.
pub fn conditional<I, R, KP, KY, KN>(
    predicate: Task<I, bool, KP>,
    on_true: Task<I, R, KY>,
    on_false: Task<I, R, KN>,
) -> Task<I, R, kinds::Conditional>
where
    I: Clone + Send + 'static,
    R: Send + 'static,
    KP: kinds::Kind,
    KY: kinds::Kind,
    KN: kinds::Kind,
{
    Task::from_descriptor(Arc::new(ConditionalDescriptor::new(
        predicate.descriptor,
        on_true.descriptor,
        Some(on_false.descriptor),
        clone_slot::<I>,
    )))
}

/// `conditional_only` is the else-less form: a false predicate runs
/// nothing, so the branch cannot produce a value the caller would miss
/// and its result type is unit.
pub fn conditional_only<I, KP, KY>(
    predicate: Task<I, bool, KP>,
    on_true: Task<I, (), KY>,
) -> Task<I, (), kinds::Conditional>
where
    I: Clone + Send + 'static,
    KP: kinds::Kind,
    KY: kinds::Kind,
{
    Task::from_descriptor(Arc::new(ConditionalDescriptor::new(
        predicate.descriptor,
        on_true.descriptor,
        None,
        clone_slot::<I>,
    )))
}

/// `loop_while` runs the body while the predicate holds, threading the
/// body's result back into the predicate and the next round. The loop's
/// result is the last body result, or the input when the body never
/// ran.
pub fn loop_while<V, KP, KB>(
    predicate: Task<V, bool, KP>,
    body: Task<V, V, KB>,
) -> Task<V, V, kinds::Loop>
where
    V: Clone + Send + 'static,
    KP: kinds::Kind,
    KB: kinds::Kind,
{
    Task::from_descriptor(Arc::new(LoopDescriptor::new(
        predicate.descriptor,
        Some(body.descriptor),
        clone_slot::<V>,
    )))
}

/// `gate` is the body-less loop: it re-evaluates the predicate until it
/// yields false.
pub fn gate<KP>(predicate: Task<(), bool, KP>) -> Task<(), (), kinds::Loop>
where
    KP: kinds::Kind,
{
    Task::from_descriptor(Arc::new(LoopDescriptor::new(
        predicate.descriptor,
        None,
        clone_slot::<()>,
    )))
}

/// `repeat` runs the body once per counter value `0..n`, with `n`
/// arriving as the repeat's input. The result is the last body result,
/// or `R::default()` when `n` is zero.
pub fn repeat<R, KB>(body: Task<u64, R, KB>) -> Task<u64, R, kinds::Repeat>
where
    R: Default + Send + 'static,
    KB: kinds::Kind,
{
    Task::from_descriptor(Arc::new(RepeatDescriptor::new(
        body.descriptor,
        default_slot::<R>,
    )))
}

/// [`Handler`] is one arm of an intercept, produced by [`handle`] or
/// [`handle_any`]. The phantom parameter pins every arm of one
/// intercept to the try-child's result type.
pub struct Handler<R> {
    pub(crate) arm: HandlerArm,
    _result: std::marker::PhantomData<fn() -> R>,
}

/// `handle` builds an arm matching faults whose payload is exactly `E`:
/// a value given to `panic_any`, a panic message, or an internal
/// [`crate::errors::TaskError`]. The matched payload becomes the handler
/// task's input.
pub fn handle<E, R, K>(task: Task<E, R, K>) -> Handler<R>
where
    E: Send + 'static,
    R: Send + 'static,
    K: kinds::Kind,
{
    Handler {
        arm: HandlerArm {
            task: task.descriptor,
            accepts: accepts_typed::<E>,
            bind: bind_typed::<E>,
        },
        _result: std::marker::PhantomData,
    }
}

/// `handle_any` builds the catch-all arm. It matches every fault and
/// receives the whole [`Failure`], so it must come last; arms after it
/// are never reached.
pub fn handle_any<R, K>(task: Task<Failure, R, K>) -> Handler<R>
where
    R: Send + 'static,
    K: kinds::Kind,
{
    Handler {
        arm: HandlerArm {
            task: task.descriptor,
            accepts: accepts_any,
            bind: bind_any,
        },
        _result: std::marker::PhantomData,
    }
}

/// `intercept` guards a task with a fault handler. Further arms are
/// appended with [`Task::or_handle`]; the first arm whose declared input
/// type matches a fault wins.
pub fn intercept<I, R, K>(attempt: Task<I, R, K>, handler: Handler<R>) -> Task<I, R, kinds::Intercept>
where
    I: Send + 'static,
    R: Send + 'static,
    K: kinds::Kind,
{
    Task::from_descriptor(Arc::new(InterceptDescriptor::new(
        attempt.descriptor,
        vec![handler.arm],
    )))
}

impl<I, R> Task<I, R, kinds::Intercept>
where
    I: Send + 'static,
    R: Send + 'static,
{
    /// `or_handle` appends one more handler arm, keeping construction
    /// order and with it the match order.
    #[must_use]
    pub fn or_handle(self, handler: Handler<R>) -> Self {
        let (attempt, handlers) = match self.descriptor.intercept_parts() {
            Some((attempt, arms)) => {
                let mut handlers = arms.to_vec();
                handlers.push(handler.arm);
                (Arc::clone(attempt), handlers)
            }
            // not reachable through the public surface; rebuilding with
            // just the new arm keeps the method total.
            None => (Arc::clone(&self.descriptor), vec![handler.arm]),
        };
        Task::from_descriptor(Arc::new(InterceptDescriptor::new(attempt, handlers)))
    }
}
