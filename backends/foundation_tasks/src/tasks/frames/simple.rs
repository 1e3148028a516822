use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::cell::ValueCell;
use crate::errors::TaskError;
use crate::queues::WorkQueue;
use crate::runners::RunnerScope;

use super::super::descriptors::{Descriptor, SimpleDescriptor};
use super::super::failure::{Failure, Outcome};
use super::{Frame, Step};

/// Execution context of a simple task: acquire the runner, feed the user
/// callable, report the result or the captured panic. One phase, one
/// outcome.
pub(crate) struct SimpleFrame<S, I, R, F> {
    descriptor: Arc<SimpleDescriptor<S, I, R, F>>,
    input: ValueCell,
}

impl<S, I, R, F> SimpleFrame<S, I, R, F>
where
    S: RunnerScope,
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(&Arc<S>, I) -> R + Send + Sync + 'static,
{
    pub(crate) fn new(descriptor: Arc<SimpleDescriptor<S, I, R, F>>, input: ValueCell) -> Self {
        Self { descriptor, input }
    }
}

impl<S, I, R, F> Frame for SimpleFrame<S, I, R, F>
where
    S: RunnerScope,
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(&Arc<S>, I) -> R + Send + Sync + 'static,
{
    fn label(&self) -> &str {
        self.descriptor.tag().label()
    }

    fn queue(&self) -> Option<Arc<WorkQueue>> {
        self.descriptor.first_queue()
    }

    fn step(&mut self) -> Step {
        let Some(scope) = self.descriptor.runner.upgrade() else {
            return Step::Complete(Outcome::Faulted(Failure::internal(
                self.label(),
                TaskError::RunnerUnavailable,
            )));
        };

        let input = match self.input.take::<I>() {
            Ok(input) => input,
            Err(err) => {
                return Step::Complete(Outcome::Faulted(Failure::internal(
                    self.label(),
                    TaskError::from(err),
                )))
            }
        };

        tracing::trace!(task = self.label(), "entering user callable");
        let call = &self.descriptor.call;
        match panic::catch_unwind(AssertUnwindSafe(|| call(&scope, input))) {
            Ok(result) => Step::Complete(Outcome::Delivered(ValueCell::of(result))),
            Err(payload) => {
                tracing::debug!(task = self.label(), "user callable panicked, fault captured");
                Step::Complete(Outcome::Faulted(Failure::from_panic(self.label(), payload)))
            }
        }
    }

    fn absorb(&mut self, outcome: Outcome) -> Step {
        // a simple frame has no children; only the driver's dead-runner
        // path delivers here.
        match outcome {
            Outcome::Faulted(failure) => Step::Complete(Outcome::Faulted(failure)),
            Outcome::Delivered(_) => Step::Complete(Outcome::Faulted(Failure::internal(
                self.label(),
                TaskError::NoTaskContext,
            ))),
        }
    }
}
