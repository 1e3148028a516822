mod signals;

pub use signals::*;
