//! Consumer side of a stream, with crash-recovery replay.
//!
//! A consumer drains its own pending-entry list (entries delivered to this
//! identity before a crash but never acknowledged) oldest-first, strictly
//! before reading anything new. That gives replay-then-continue semantics:
//! after a restart, in-flight work is redelivered in its original order
//! ahead of fresh entries.

use crate::log::{BatchRead, EntryId, StreamLog};
use crate::{QueueError, Result};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default consumer-group name.
pub const DEFAULT_GROUP: &str = "consumers";

/// Default consumer identity within the group.
pub const DEFAULT_CONSUMER: &str = "consumer";

/// Page size for pending replay and live reads.
pub const BATCH_SIZE: usize = 10;

/// Reliable at-least-once reader over one named stream.
///
/// Holds two log handles: blocking group reads go through one, everything
/// administrative (group creation, pending ranges, fetch-by-id, acks) through
/// the other, so a parked read can never starve an acknowledgment.
pub struct Consumer<T> {
    blocking: Arc<dyn StreamLog>,
    admin: Arc<dyn StreamLog>,
    stream: String,
    group: String,
    consumer: String,
    cancel: CancellationToken,

    initialized: bool,
    /// Pending ids not yet redelivered, oldest first.
    pending: VecDeque<EntryId>,
    /// Exclusive lower bound for the next pending page.
    last_pending_cursor: EntryId,
    /// Flips false -> true exactly once, when a pending page comes back
    /// empty; never reverts.
    pending_exhausted: bool,
    /// Freshly read live entries not yet handed to the caller.
    buffered: VecDeque<(EntryId, T)>,
}

impl<T: DeserializeOwned> Consumer<T> {
    /// Create a consumer with the default group and consumer identity.
    pub fn new(
        blocking: Arc<dyn StreamLog>,
        admin: Arc<dyn StreamLog>,
        stream: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_identity(blocking, admin, stream, DEFAULT_GROUP, DEFAULT_CONSUMER, cancel)
    }

    /// Create a consumer with an explicit group and consumer identity.
    ///
    /// Re-registering under an identity that crashed recovers that
    /// identity's unacknowledged entries.
    pub fn with_identity(
        blocking: Arc<dyn StreamLog>,
        admin: Arc<dyn StreamLog>,
        stream: impl Into<String>,
        group: impl Into<String>,
        consumer: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            blocking,
            admin,
            stream: stream.into(),
            group: group.into(),
            consumer: consumer.into(),
            cancel,
            initialized: false,
            pending: VecDeque::new(),
            last_pending_cursor: EntryId::ZERO,
            pending_exhausted: false,
            buffered: VecDeque::new(),
        }
    }

    /// The stream this consumer reads.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    async fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.admin.ensure_group(&self.stream, &self.group).await?;
        self.admin
            .register_consumer(&self.stream, &self.group, &self.consumer)
            .await?;
        self.populate_pending().await?;
        self.initialized = true;
        Ok(())
    }

    /// Load the next page of pending ids, strictly after the last page.
    async fn populate_pending(&mut self) -> Result<()> {
        if self.pending_exhausted {
            return Err(QueueError::Cursor("pending already exhausted"));
        }
        if !self.pending.is_empty() {
            return Err(QueueError::Cursor("pending page not drained"));
        }

        let ids = self
            .admin
            .pending_range(
                &self.stream,
                &self.group,
                &self.consumer,
                self.last_pending_cursor,
                BATCH_SIZE,
            )
            .await?;

        match ids.last() {
            None => {
                debug!(stream = %self.stream, "all pending entries loaded");
                self.pending_exhausted = true;
            }
            Some(last) => {
                self.last_pending_cursor = *last;
                self.pending.extend(ids);
            }
        }
        Ok(())
    }

    /// Blocking read of a fresh live batch into the buffer.
    async fn load_batch(&mut self) -> Result<()> {
        if !self.pending_exhausted {
            return Err(QueueError::Cursor("live read before pending drained"));
        }
        if !self.buffered.is_empty() {
            return Err(QueueError::Cursor("live buffer not drained"));
        }

        let batch = self
            .blocking
            .read_group(
                &self.stream,
                &self.group,
                &self.consumer,
                BATCH_SIZE,
                &self.cancel,
            )
            .await?;

        match batch {
            BatchRead::Interrupted => Err(QueueError::Interrupted),
            BatchRead::Entries(entries) => {
                for entry in entries {
                    match self.decode(entry.id, &entry.payload) {
                        Some(value) => self.buffered.push_back((entry.id, value)),
                        None => self.discard(entry.id).await?,
                    }
                }
                Ok(())
            }
        }
    }

    /// Decode one payload; `None` means the entry is malformed and has been
    /// logged with enough context to replay manually.
    fn decode(&self, id: EntryId, payload: &str) -> Option<T> {
        match serde_json::from_str(payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    stream = %self.stream, %id, payload, %err,
                    "malformed entry payload; skipping"
                );
                None
            }
        }
    }

    /// Ack a malformed entry so it cannot clog the pending-entry list.
    async fn discard(&self, id: EntryId) -> Result<()> {
        self.admin.ack(&self.stream, &self.group, id).await?;
        Ok(())
    }

    /// Return the oldest not-yet-returned entry.
    ///
    /// Order: already-buffered entries first, then pending replay (paging in
    /// more pending ids as pages drain), then fresh blocking live batches.
    /// A cancelled blocking read surfaces as [`QueueError::Interrupted`].
    pub async fn next(&mut self) -> Result<(EntryId, T)> {
        self.init().await?;

        if let Some(entry) = self.buffered.pop_front() {
            return Ok(entry);
        }

        while let Some(id) = self.pending.pop_front() {
            // Refill the page as soon as it drains so the last id of one
            // page cannot hide the start of the next.
            if self.pending.is_empty() && !self.pending_exhausted {
                self.populate_pending().await?;
            }

            match self.admin.range_by_id(&self.stream, id).await? {
                Some(payload) => match self.decode(id, &payload) {
                    Some(value) => return Ok((id, value)),
                    None => self.discard(id).await?,
                },
                None => {
                    warn!(stream = %self.stream, %id, "pending entry trimmed from log; skipping");
                }
            }
        }

        loop {
            self.load_batch().await?;
            if let Some(entry) = self.buffered.pop_front() {
                return Ok(entry);
            }
            // Whole batch was malformed and discarded; read again.
        }
    }

    /// Acknowledge one delivered entry.
    ///
    /// Must succeed exactly once per id: a second commit, or a commit for an
    /// id never delivered to this group, is a
    /// [`QueueError::CommitViolation`].
    pub async fn commit(&mut self, id: EntryId) -> Result<()> {
        self.init().await?;
        let count = self.admin.ack(&self.stream, &self.group, id).await?;
        if count != 1 {
            return Err(QueueError::CommitViolation { id, count });
        }
        Ok(())
    }
}
