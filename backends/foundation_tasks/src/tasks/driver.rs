//! The scheduler driver: the small reentrant routine that submits the
//! top of a context stack to its runner and re-enters when a frame
//! completes.
//!
//! Between a child being pushed and the child actually running, control
//! always returns here, so the next submission targets the child's
//! runner; that hop is how a composition crosses runners without ever
//! blocking a worker thread. For the same reason a completed frame never
//! re-enters the next frame synchronously through its own entry point:
//! after every descend the stack goes back through a queue, which keeps
//! tight predicate loops fair towards other work on the same runner.

use crate::errors::TaskError;
use crate::queues::WorkItem;

use super::failure::{Failure, Outcome};
use super::frames::Step;
use super::stack::ContextStack;

/// `kickstart` launches a freshly populated stack.
pub(crate) fn kickstart(stack: ContextStack) {
    drive(stack);
}

/// `drive` submits the stack to the runner of its top frame. When that
/// runner is already gone the frame absorbs a synthesized
/// [`TaskError::RunnerUnavailable`] fault, so an intercept frame waiting
/// on the dead task still gets to match it.
fn drive(mut stack: ContextStack) {
    loop {
        let directive = match stack.top_mut() {
            None => return,
            Some(top) => (top.queue(), top.label().to_owned()),
        };

        match directive {
            (Some(queue), label) => {
                tracing::trace!(frame = %label, queue = queue.name(), depth = stack.depth(), "submitting stack");
                queue.enqueue(WorkItem::new(move || advance(stack)));
                return;
            }
            (None, label) => {
                tracing::debug!(frame = %label, "runner gone before dispatch");
                let fault = Outcome::Faulted(Failure::internal(
                    &label,
                    TaskError::RunnerUnavailable,
                ));
                let step = match stack.top_mut() {
                    Some(top) => top.absorb(fault),
                    None => return,
                };
                if !apply(&mut stack, step) {
                    return;
                }
            }
        }
    }
}

/// `advance` is the worker shim: it runs one phase of the top frame on
/// the runner the stack was submitted to, then re-drives.
fn advance(mut stack: ContextStack) {
    let step = match stack.top_mut() {
        Some(top) => top.step(),
        None => {
            tracing::error!("worker entered an empty context stack");
            return;
        }
    };

    if apply(&mut stack, step) {
        drive(stack);
    }
}

/// `apply` folds one frame step into the stack. Returns true while the
/// stack still has frames that need driving.
fn apply(stack: &mut ContextStack, step: Step) -> bool {
    match step {
        Step::Descend(descriptor, input) => {
            descriptor.instantiate(stack, input);
            true
        }
        Step::Complete(outcome) => {
            stack.pop();
            settle(stack, outcome)
        }
    }
}

/// `settle` delivers a completed frame's outcome upward. Parents absorb
/// the outcome one after another on the current thread until one of them
/// descends into a new child or the stack runs empty. An outcome nobody
/// absorbed marks the end of the run and is dropped.
fn settle(stack: &mut ContextStack, outcome: Outcome) -> bool {
    let mut outcome = outcome;
    loop {
        let Some(parent) = stack.top_mut() else {
            if let Outcome::Faulted(failure) = outcome {
                tracing::debug!(
                    origin = failure.origin(),
                    fault = %failure.describe(),
                    "uncontained fault dropped at top level"
                );
            }
            return false;
        };

        match parent.absorb(outcome) {
            Step::Descend(descriptor, input) => {
                descriptor.instantiate(stack, input);
                return true;
            }
            Step::Complete(next) => {
                stack.pop();
                outcome = next;
            }
        }
    }
}
