use std::mem;
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::errors::TaskError;
use crate::queues::WorkQueue;

use super::super::descriptors::{Descriptor, LoopDescriptor};
use super::super::failure::{Failure, Outcome};
use super::{Frame, Step};

enum LoopPhase {
    Predicate,
    Body,
}

/// Execution context of a loop: evaluate the predicate with a clone of
/// the current value, run the body with the value itself while the
/// predicate holds, and carry the body's result into the next round.
/// When the predicate first yields false the current value is the
/// result, which is the original input if the body never ran. The body-less form
/// keeps re-evaluating the predicate over unit until it yields false.
pub(crate) struct LoopFrame {
    descriptor: Arc<LoopDescriptor>,
    phase: LoopPhase,
    current: ValueCell,
}

impl LoopFrame {
    pub(crate) fn new(descriptor: Arc<LoopDescriptor>, input: ValueCell) -> Self {
        Self {
            descriptor,
            phase: LoopPhase::Predicate,
            current: input,
        }
    }

    fn descend_predicate(&mut self) -> Step {
        self.phase = LoopPhase::Predicate;
        match (self.descriptor.cloner)(&self.current) {
            Ok(cloned) => Step::Descend(Arc::clone(&self.descriptor.predicate), cloned),
            Err(err) => Step::Complete(Outcome::Faulted(Failure::internal(
                self.descriptor.tag().label(),
                TaskError::from(err),
            ))),
        }
    }
}

impl Frame for LoopFrame {
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        self.descend_predicate()
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        match self.phase {
            LoopPhase::Predicate => match outcome {
                Outcome::Delivered(mut cell) => match cell.take::<bool>() {
                    Ok(true) => match &self.descriptor.body {
                        Some(body) => {
                            self.phase = LoopPhase::Body;
                            let body = Arc::clone(body);
                            Step::Descend(body, mem::take(&mut self.current))
                        }
                        // tight re-evaluation when there is no body.
                        None => self.descend_predicate(),
                    },
                    Ok(false) => {
                        Step::Complete(Outcome::Delivered(mem::take(&mut self.current)))
                    }
                    Err(err) => Step::Complete(Outcome::Faulted(Failure::internal(
                        self.label(),
                        TaskError::from(err),
                    ))),
                },
                Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
            },
            LoopPhase::Body => match outcome {
                Outcome::Delivered(cell) => {
                    self.current = cell;
                    self.descend_predicate()
                }
                Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
            },
        }
    }
}
