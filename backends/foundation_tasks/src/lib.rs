//! Composable task execution core.
//!
//! The crate provides named [`runners::Runner`] execution queues backed by a
//! process-wide worker thread pool, and a family of statically typed,
//! composable tasks (simple, sequence, conditional, loop, repeat, intercept)
//! that can be assembled into a graph and launched with an input value.
//!
//! A launched graph never blocks a thread while waiting: each subtask is
//! submitted to its own runner and the composition's call stack lives on a
//! heap stack object that hops between runners as subtasks complete.

pub mod cell;
pub mod errors;
pub mod ident;
pub mod pool;
pub mod queues;
pub mod runners;
pub mod synca;
pub mod tasks;
pub mod types;
