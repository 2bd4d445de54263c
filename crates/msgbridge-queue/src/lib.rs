//! Reliable message-delivery substrate for msgbridge.
//!
//! This crate provides the log-backed producer/consumer layer the bridge is
//! built on, together with the ordering and correlation primitives layered
//! on top of it:
//!
//! - [`StreamLog`]: the append-only log abstraction (consumer groups,
//!   pending-entry lists, blocking group reads)
//! - [`MemoryLog`]: an in-process implementation of [`StreamLog`]
//! - [`Producer`] / [`Consumer`]: at-least-once delivery with
//!   replay-then-continue crash recovery
//! - [`OrderingGate`]: FIFO commit ordering for concurrently-prepared effects
//! - [`retry`]: bounded retry for side-effecting worker operations
//! - [`TaskClient`]: request/response correlation over a shared task stream

pub mod consumer;
pub mod correlate;
pub mod error;
pub mod gate;
pub mod log;
pub mod memory;
pub mod producer;
pub mod retry;

pub use consumer::{Consumer, BATCH_SIZE, DEFAULT_CONSUMER, DEFAULT_GROUP};
pub use correlate::TaskClient;
pub use error::QueueError;
pub use gate::{OrderingGate, Ticket};
pub use log::{BatchRead, EntryId, LogError, RawEntry, StreamLog};
pub use memory::MemoryLog;
pub use producer::Producer;
pub use retry::{retry, DEFAULT_MAX_RETRIES};

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
