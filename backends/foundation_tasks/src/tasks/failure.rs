use std::any::Any;

use crate::cell::ValueCell;
use crate::errors::TaskError;

/// [`Failure`] is a fault captured while a task graph was executing: the
/// payload of a panic that escaped a user callable, or an internal error
/// the runtime delivers through the same channel (so an intercept frame
/// can match it like any other fault).
///
/// The payload keeps its original type, which is what intercept handlers
/// match on.
pub struct Failure {
    origin: String,
    payload: Box<dyn Any + Send>,
}

impl Failure {
    pub(crate) fn from_panic(origin: &str, payload: Box<dyn Any + Send>) -> Self {
        Self {
            origin: origin.to_owned(),
            payload,
        }
    }

    pub(crate) fn internal(origin: &str, error: TaskError) -> Self {
        Self {
            origin: origin.to_owned(),
            payload: Box::new(error),
        }
    }

    /// `origin` names the task the fault was captured in.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `is` probes the payload type without consuming the failure.
    #[must_use]
    pub fn is<E: 'static>(&self) -> bool {
        self.payload.is::<E>()
    }

    /// `downcast` recovers the typed payload, handing the failure back
    /// unchanged when the type does not match.
    pub fn downcast<E: 'static>(self) -> Result<E, Failure> {
        match self.payload.downcast::<E>() {
            Ok(payload) => Ok(*payload),
            Err(payload) => Err(Self {
                origin: self.origin,
                payload,
            }),
        }
    }

    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    /// `describe` renders the payload for logging: panic messages and
    /// runtime errors print their text, anything else stays opaque.
    #[must_use]
    pub fn describe(&self) -> String {
        if let Some(text) = self.payload.downcast_ref::<&str>() {
            return (*text).to_owned();
        }
        if let Some(text) = self.payload.downcast_ref::<String>() {
            return text.clone();
        }
        if let Some(error) = self.payload.downcast_ref::<TaskError>() {
            return error.to_string();
        }
        String::from("opaque fault payload")
    }
}

impl core::fmt::Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failure({} in {})", self.describe(), self.origin)
    }
}

/// [`Outcome`] is the single value a finished frame reports to its
/// parent: either a delivered result or a captured fault. Every frame
/// reports exactly one outcome.
#[derive(Debug)]
pub enum Outcome {
    Delivered(ValueCell),
    Faulted(Failure),
}
