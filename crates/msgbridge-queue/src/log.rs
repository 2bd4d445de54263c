//! The append-only stream-log abstraction.
//!
//! A stream is an id-ordered log of entries. A consumer group is a named
//! cursor over one stream shared by one or more consumer identities; entries
//! delivered to an identity but not yet acknowledged sit in that identity's
//! pending-entry list until acked, which is what makes crash recovery
//! possible.
//!
//! Each role (producer, blocking consumer, admin consumer) should be given
//! its own handle so a blocking group read can never starve acknowledgment
//! or pending-range calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Opaque, totally-ordered entry id assigned by the log on append.
///
/// Producers never choose ids; ordering is only meaningful within a single
/// stream.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl EntryId {
    /// The exclusive lower bound before the first entry of any stream.
    pub const ZERO: EntryId = EntryId(0);
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entry as stored in the log: id plus serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Log-assigned id.
    pub id: EntryId,

    /// Serialized payload.
    pub payload: String,
}

/// Outcome of a blocking group read.
///
/// Interruption is a tagged variant rather than an error so callers must
/// match "asked to stop" and "log is broken" explicitly.
#[derive(Debug)]
pub enum BatchRead {
    /// One or more never-before-delivered entries, in append order.
    Entries(Vec<RawEntry>),

    /// The read was cancelled by the shutdown token.
    Interrupted,
}

/// Errors surfaced by a log backend.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log is unreachable or answered with a transport-level failure.
    #[error("Log unavailable: {0}")]
    Unavailable(String),

    /// An operation referenced a consumer group that was never created.
    #[error("No such group {group:?} on stream {stream:?}")]
    NoSuchGroup {
        /// Stream name.
        stream: String,
        /// Group name.
        group: String,
    },
}

/// Required primitive operations of the underlying append-only log store.
///
/// Implementations must assign monotonically increasing ids per stream and
/// maintain per-group delivery cursors plus per-consumer pending-entry lists.
#[async_trait]
pub trait StreamLog: Send + Sync {
    /// Durably append one entry; returns the log-assigned id.
    async fn append(&self, stream: &str, payload: String) -> Result<EntryId, LogError>;

    /// Ensure a consumer group exists on the stream, creating the stream if
    /// needed. Idempotent: "group already exists" is not an error.
    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), LogError>;

    /// Register a consumer identity within a group. Idempotent.
    async fn register_consumer(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
    ) -> Result<(), LogError>;

    /// Ids pending for a consumer identity, strictly after `after`, oldest
    /// first, at most `limit`.
    async fn pending_range(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        after: EntryId,
        limit: usize,
    ) -> Result<Vec<EntryId>, LogError>;

    /// Blocking read of up to `limit` never-before-delivered entries for the
    /// group, attributing them to `consumer`. Blocks until at least one entry
    /// is available or `cancel` fires, in which case the tagged
    /// [`BatchRead::Interrupted`] is returned.
    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchRead, LogError>;

    /// Fetch a single entry's payload by id; `None` if the entry has been
    /// trimmed or never existed.
    async fn range_by_id(&self, stream: &str, id: EntryId) -> Result<Option<String>, LogError>;

    /// Acknowledge one entry for the group; returns the number of entries
    /// removed from pending-entry lists (1 on success).
    async fn ack(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, LogError>;
}
