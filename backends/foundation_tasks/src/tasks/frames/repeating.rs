use std::mem;
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::errors::TaskError;
use crate::queues::WorkQueue;

use super::super::descriptors::{Descriptor, RepeatDescriptor};
use super::super::failure::{Failure, Outcome};
use super::{Frame, Step};

/// Execution context of a repeat: runs the body once per counter value
/// `0..n`, where `n` arrives as the repeat's own input. The last body
/// result is the repeat's result; for zero rounds the result type's
/// default is delivered and the body never runs.
pub(crate) struct RepeatFrame {
    descriptor: Arc<RepeatDescriptor>,
    input: ValueCell,
    rounds: u64,
    next: u64,
    last: ValueCell,
}

impl RepeatFrame {
    pub(crate) fn new(descriptor: Arc<RepeatDescriptor>, input: ValueCell) -> Self {
        Self {
            descriptor,
            input,
            rounds: 0,
            next: 0,
            last: ValueCell::empty(),
        }
    }
}

impl Frame for RepeatFrame {
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        self.rounds = match self.input.take::<u64>() {
            Ok(rounds) => rounds,
            Err(err) => {
                return Step::Complete(Outcome::Faulted(Failure::internal(
                    self.label(),
                    TaskError::from(err),
                )))
            }
        };

        if self.rounds == 0 {
            return Step::Complete(Outcome::Delivered((self.descriptor.default_result)()));
        }

        self.next = 1;
        Step::Descend(Arc::clone(&self.descriptor.body), ValueCell::of(0u64))
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Outcome::Delivered(cell) => {
                self.last = cell;
                if self.next < self.rounds {
                    let counter = self.next;
                    self.next += 1;
                    Step::Descend(Arc::clone(&self.descriptor.body), ValueCell::of(counter))
                } else {
                    Step::Complete(Outcome::Delivered(mem::take(&mut self.last)))
                }
            }
            Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
        }
    }
}
