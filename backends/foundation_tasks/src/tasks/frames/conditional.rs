use std::mem;
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::errors::TaskError;
use crate::queues::WorkQueue;

use super::super::descriptors::{ConditionalDescriptor, Descriptor};
use super::super::failure::{Failure, Outcome};
use super::{Frame, Step};

enum ConditionalPhase {
    Predicate,
    Branch,
}

/// Execution context of a conditional: resolve the predicate with a
/// clone of the input, then run exactly one branch with the input
/// itself. A false predicate without an else branch completes with unit
/// and runs nothing.
pub(crate) struct ConditionalFrame {
    descriptor: Arc<ConditionalDescriptor>,
    phase: ConditionalPhase,
    input: ValueCell,
}

impl ConditionalFrame {
    pub(crate) fn new(descriptor: Arc<ConditionalDescriptor>, input: ValueCell) -> Self {
        Self {
            descriptor,
            phase: ConditionalPhase::Predicate,
            input,
        }
    }
}

impl Frame for ConditionalFrame {
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        match (self.descriptor.cloner)(&self.input) {
            Ok(cloned) => Step::Descend(Arc::clone(&self.descriptor.predicate), cloned),
            Err(err) => Step::Complete(Outcome::Faulted(Failure::internal(
                self.label(),
                TaskError::from(err),
            ))),
        }
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        match self.phase {
            ConditionalPhase::Predicate => match outcome {
                Outcome::Delivered(mut cell) => match cell.take::<bool>() {
                    Ok(true) => {
                        self.phase = ConditionalPhase::Branch;
                        Step::Descend(
                            Arc::clone(&self.descriptor.on_true),
                            mem::take(&mut self.input),
                        )
                    }
                    Ok(false) => match &self.descriptor.on_false {
                        Some(on_false) => {
                            self.phase = ConditionalPhase::Branch;
                            let branch = Arc::clone(on_false);
                            Step::Descend(branch, mem::take(&mut self.input))
                        }
                        None => Step::Complete(Outcome::Delivered(ValueCell::unit())),
                    },
                    Err(err) => Step::Complete(Outcome::Faulted(Failure::internal(
                        self.label(),
                        TaskError::from(err),
                    ))),
                },
                Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
            },
            ConditionalPhase::Branch => Step::Complete(outcome),
        }
    }
}
