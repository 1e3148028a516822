use std::mem;
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::queues::WorkQueue;

use super::super::descriptors::{Descriptor, SequenceDescriptor};
use super::super::failure::Outcome;
use super::{Frame, Step};

/// Execution context of a sequence: feeds each stage's result into the
/// next stage, delivers the last stage's result upward, and lets the
/// first fault short-circuit past the remaining stages.
pub(crate) struct SequenceFrame {
    descriptor: Arc<SequenceDescriptor>,
    cursor: usize,
    input: ValueCell,
}

impl SequenceFrame {
    pub(crate) fn new(descriptor: Arc<SequenceDescriptor>, input: ValueCell) -> Self {
        Self {
            descriptor,
            cursor: 0,
            input,
        }
    }
}

impl Frame for SequenceFrame {
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        self.cursor = 1;
        Step::Descend(
            Arc::clone(&self.descriptor.stages[0]),
            mem::take(&mut self.input),
        )
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Delivered(cell) => {
                if self.cursor < self.descriptor.stages.len() {
                    let stage = Arc::clone(&self.descriptor.stages[self.cursor]);
                    self.cursor += 1;
                    Step::Descend(stage, cell)
                } else {
                    Step::Complete(Outcome::Delivered(cell))
                }
            }
            Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
        }
    }
}
