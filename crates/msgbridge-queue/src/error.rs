//! Queue error types.

use crate::log::{EntryId, LogError};
use thiserror::Error;

/// Errors that can occur in the delivery substrate.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Underlying log failure; propagated uninterpreted, the caller decides
    /// whether to retry or shut down.
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// A blocking read was cancelled by shutdown. Distinguished from real
    /// failures so loops can exit cleanly.
    #[error("Read interrupted by shutdown")]
    Interrupted,

    /// Payload serialization failed before append.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// An acknowledgment did not land on exactly one entry: either a double
    /// commit or a commit for an id never delivered to this group. This is a
    /// caller bookkeeping bug, never swallowed.
    #[error("Commit for {id} acknowledged {count} entries")]
    CommitViolation {
        /// The committed entry id.
        id: EntryId,
        /// Number of entries the log acknowledged.
        count: u64,
    },

    /// Internal cursor bookkeeping violated an invariant.
    #[error("Consumer cursor violation: {0}")]
    Cursor(&'static str),

    /// A bounded-retry operation exhausted its budget.
    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded {
        /// Total failed attempts, including the initial one.
        attempts: u32,
    },
}

impl QueueError {
    /// Whether this error is the distinguished shutdown interruption.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, QueueError::Interrupted)
    }
}
