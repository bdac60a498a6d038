//! Compute module - The automaton driven by the worker.

mod automaton;
mod universe;

pub use automaton::*;
pub use universe::*;
