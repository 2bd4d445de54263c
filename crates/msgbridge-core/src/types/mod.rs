//! Common type definitions shared across msgbridge crates.

mod message;
mod task;

pub use message::*;
pub use task::*;
