use derive_more::derive::From;

use crate::cell::CellError;
use crate::types::BoxedError;

/// [`TaskError`] enumerates every failure the execution core can surface,
/// either as a return value from a constructor or as a captured fault
/// travelling up a context stack towards an intercept frame.
#[derive(Debug, From)]
pub enum TaskError {
    /// Sentinel for call sites that report status through an error slot
    /// and have nothing to report.
    NotAnError,

    /// A simple task could not acquire a strong reference to its runner
    /// because the runner was dropped before the task was dispatched.
    RunnerUnavailable,

    /// Downcast from the abstract runner to the user runner scope failed.
    BadRunnerCast,

    /// The scheduler found an empty or detached context stack where a
    /// live frame was expected.
    NoTaskContext,

    /// Operation attempted on an object that is not in a valid state for
    /// it, e.g. submitting work to a queue that was already released.
    WrongState,

    /// A value was outside the accepted range or otherwise mis-shaped.
    IllegalArgument,

    /// A typed read from a value cell did not match the stored type.
    BadConversion,

    /// The backing resource could not be acquired.
    ResourceBusy,

    /// An atomic state word was observed in a combination that the
    /// transition table does not produce.
    ConcurrencyProblem,

    /// Operation attempted on a default-constructed or emptied handle.
    EmptyObject,

    /// Construction-time validation of a task composition failed. The
    /// factory enforces its typing rules through the type system, so this
    /// kind is reserved for dynamically assembled graphs.
    TypingError,

    /// The underlying worker pool or work queue could not be created.
    #[from(ignore)]
    CreateFailure(BoxedError),
}

impl std::error::Error for TaskError {}

impl core::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::NotAnError => write!(f, "no error has occurred"),
            TaskError::RunnerUnavailable => {
                write!(f, "the destination runner is not available")
            }
            TaskError::BadRunnerCast => {
                write!(f, "cast to the concrete runner scope unexpectedly failed")
            }
            TaskError::NoTaskContext => {
                write!(f, "the task context stack is empty or detached")
            }
            TaskError::WrongState => {
                write!(f, "the object is not in a valid state for the operation")
            }
            TaskError::IllegalArgument => write!(f, "illegal argument"),
            TaskError::BadConversion => {
                write!(f, "stored value does not convert to the requested type")
            }
            TaskError::ResourceBusy => write!(f, "backing resource is busy"),
            TaskError::ConcurrencyProblem => {
                write!(f, "unexpected atomic state observed")
            }
            TaskError::EmptyObject => {
                write!(f, "operation on an empty handle")
            }
            TaskError::TypingError => {
                write!(f, "task composition failed type validation")
            }
            TaskError::CreateFailure(inner) => {
                write!(f, "failed to create the backing facility: {inner}")
            }
        }
    }
}

impl From<CellError> for TaskError {
    fn from(value: CellError) -> Self {
        match value {
            CellError::Vacant => TaskError::EmptyObject,
            CellError::Mismatch => TaskError::BadConversion,
        }
    }
}

#[cfg(test)]
mod test_task_error {
    use super::*;

    #[test]
    fn cell_errors_map_onto_the_public_kinds() {
        assert!(matches!(
            TaskError::from(CellError::Vacant),
            TaskError::EmptyObject
        ));
        assert!(matches!(
            TaskError::from(CellError::Mismatch),
            TaskError::BadConversion
        ));
    }

    #[test]
    fn create_failure_carries_the_cause() {
        let cause: BoxedError = Box::new(std::io::Error::other("no threads"));
        let err = TaskError::CreateFailure(cause);
        assert!(format!("{err}").contains("no threads"));
    }
}
