use std::any::Any;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum CellError {
    #[error("the cell holds no value")]
    Vacant,

    #[error("the cell holds a value of a different type")]
    Mismatch,
}

/// [`ValueCell`] is a type-erased, single-slot owning container.
///
/// Compound tasks move values of arbitrary user types between their
/// subtasks without knowing those types statically once a value crosses a
/// compound boundary; the cell is the narrow waist they cross through.
/// Payloads only need to be `Send`; a move-only value can be stored and
/// later recovered with [`ValueCell::take`] without ever being cloned.
pub struct ValueCell {
    slot: Option<Box<dyn Any + Send>>,
}

impl Default for ValueCell {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.slot {
            Some(_) => write!(f, "ValueCell(occupied)"),
            None => write!(f, "ValueCell(vacant)"),
        }
    }
}

impl ValueCell {
    #[must_use]
    pub fn empty() -> Self {
        Self { slot: None }
    }

    /// `unit` returns a cell holding the unit value, the representation
    /// of "no meaningful input" between subtasks.
    #[must_use]
    pub fn unit() -> Self {
        Self::of(())
    }

    #[must_use]
    pub fn of<T: Send + 'static>(value: T) -> Self {
        Self {
            slot: Some(Box::new(value)),
        }
    }

    /// `store` replaces whatever the cell currently holds.
    pub fn store<T: Send + 'static>(&mut self, value: T) {
        self.slot = Some(Box::new(value));
    }

    /// `peek` reads the stored value by reference.
    pub fn peek<T: 'static>(&self) -> Result<&T, CellError> {
        match &self.slot {
            None => Err(CellError::Vacant),
            Some(boxed) => boxed.downcast_ref::<T>().ok_or(CellError::Mismatch),
        }
    }

    /// `take` consumes the stored value. After a successful take the cell
    /// is empty. A mismatched type leaves the stored value in place.
    pub fn take<T: 'static>(&mut self) -> Result<T, CellError> {
        match self.slot.take() {
            None => Err(CellError::Vacant),
            Some(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(kept) => {
                    self.slot = Some(kept);
                    Err(CellError::Mismatch)
                }
            },
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
