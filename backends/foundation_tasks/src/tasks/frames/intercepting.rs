use std::mem;
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::queues::WorkQueue;

use super::super::descriptors::{Descriptor, InterceptDescriptor};
use super::super::failure::Outcome;
use super::{Frame, Step};

enum InterceptPhase {
    Attempt,
    Handling,
}

/// Execution context of an intercept: run the try-child and forward its
/// result untouched; when it faults, walk the handler arms in
/// construction order and descend into the first one whose declared
/// input type matches the fault payload. A handler's own outcome,
/// result or new fault, propagates upward. A fault no handler matches
/// escapes unchanged.
pub(crate) struct InterceptFrame {
    descriptor: Arc<InterceptDescriptor>,
    phase: InterceptPhase,
    input: ValueCell,
}

impl InterceptFrame {
    pub(crate) fn new(descriptor: Arc<InterceptDescriptor>, input: ValueCell) -> Self {
        Self {
            descriptor,
            phase: InterceptPhase::Attempt,
            input,
        }
    }
}

impl Frame for InterceptFrame {
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        Step::Descend(
            Arc::clone(&self.descriptor.attempt),
            mem::take(&mut self.input),
        )
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        match self.phase {
            InterceptPhase::Attempt => match outcome {
                Outcome::Delivered(cell) => Step::Complete(Outcome::Delivered(cell)),
                Outcome::Faulted(failure) => {
                    let matched = self
                        .descriptor
                        .handlers
                        .iter()
                        .position(|arm| (arm.accepts)(&failure));

                    match matched {
                        Some(index) => {
                            self.phase = InterceptPhase::Handling;
                            let arm = &self.descriptor.handlers[index];
                            tracing::debug!(
                                intercept = self.descriptor.tag().label(),
                                handler = arm.task.tag().label(),
                                "fault matched an intercept handler"
                            );
                            Step::Descend(Arc::clone(&arm.task), (arm.bind)(failure))
                        }
                        None => Step::Complete(Outcome::Faulted(failure)),
                    }
                }
            },
            InterceptPhase::Handling => Step::Complete(outcome),
        }
    }
}
