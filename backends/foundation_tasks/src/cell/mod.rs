mod value_cell;

pub use value_cell::*;
