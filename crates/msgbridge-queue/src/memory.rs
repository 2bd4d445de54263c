//! In-process implementation of [`StreamLog`].
//!
//! Backs every test in this workspace and doubles as the embedded backend
//! for single-process deployments. A networked backend implements the same
//! trait against a real log server; nothing above the trait changes.

use crate::log::{BatchRead, EntryId, LogError, RawEntry, StreamLog};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// An in-memory append-only log with consumer groups and pending-entry
/// lists.
///
/// Cloning yields another handle to the same log, so per-role handles are
/// cheap.
#[derive(Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<HashMap<String, StreamState>>>,
    appended: Arc<Notify>,
}

#[derive(Default)]
struct StreamState {
    next_id: u64,
    entries: BTreeMap<EntryId, String>,
    groups: HashMap<String, GroupState>,
}

#[derive(Default)]
struct GroupState {
    last_delivered: EntryId,
    /// Pending-entry list per consumer identity.
    consumers: HashMap<String, BTreeSet<EntryId>>,
}

impl MemoryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all entries with id `<= up_to` from a stream, modeling log
    /// expiry. Pending-entry lists keep their ids: a consumer replaying its
    /// PEL will find the entry gone and skip it.
    pub fn trim(&self, stream: &str, up_to: EntryId) {
        let mut streams = self.inner.lock();
        if let Some(state) = streams.get_mut(stream) {
            state.entries.retain(|id, _| *id > up_to);
        }
    }

    /// Number of entries currently pending for a consumer identity.
    /// Test/introspection helper.
    pub fn pending_count(&self, stream: &str, group: &str, consumer: &str) -> usize {
        let streams = self.inner.lock();
        streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .and_then(|g| g.consumers.get(consumer))
            .map(|pel| pel.len())
            .unwrap_or(0)
    }

    fn try_read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        limit: usize,
    ) -> Result<Option<Vec<RawEntry>>, LogError> {
        let mut streams = self.inner.lock();
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| no_such_group(stream, group))?;
        let cursor = state.groups.get(group).map(|g| g.last_delivered);
        let cursor = cursor.ok_or_else(|| no_such_group(stream, group))?;

        let batch: Vec<RawEntry> = state
            .entries
            .range((
                std::ops::Bound::Excluded(cursor),
                std::ops::Bound::Unbounded,
            ))
            .take(limit)
            .map(|(id, payload)| RawEntry {
                id: *id,
                payload: payload.clone(),
            })
            .collect();

        if batch.is_empty() {
            return Ok(None);
        }

        let group_state = state.groups.get_mut(group).expect("group checked above");
        group_state.last_delivered = batch.last().expect("non-empty batch").id;
        let pel = group_state.consumers.entry(consumer.to_string()).or_default();
        for entry in &batch {
            pel.insert(entry.id);
        }

        Ok(Some(batch))
    }
}

fn no_such_group(stream: &str, group: &str) -> LogError {
    LogError::NoSuchGroup {
        stream: stream.to_string(),
        group: group.to_string(),
    }
}

#[async_trait]
impl StreamLog for MemoryLog {
    async fn append(&self, stream: &str, payload: String) -> Result<EntryId, LogError> {
        let id = {
            let mut streams = self.inner.lock();
            let state = streams.entry(stream.to_string()).or_default();
            state.next_id += 1;
            let id = EntryId(state.next_id);
            state.entries.insert(id, payload);
            id
        };
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn ensure_group(&self, stream: &str, group: &str) -> Result<(), LogError> {
        let mut streams = self.inner.lock();
        let state = streams.entry(stream.to_string()).or_default();
        if state.groups.contains_key(group) {
            debug!(stream, group, "consumer group already exists");
        } else {
            state.groups.insert(group.to_string(), GroupState::default());
        }
        Ok(())
    }

    async fn register_consumer(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
    ) -> Result<(), LogError> {
        let mut streams = self.inner.lock();
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| no_such_group(stream, group))?;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| no_such_group(stream, group))?;
        group_state
            .consumers
            .entry(consumer.to_string())
            .or_default();
        Ok(())
    }

    async fn pending_range(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        after: EntryId,
        limit: usize,
    ) -> Result<Vec<EntryId>, LogError> {
        let streams = self.inner.lock();
        let state = streams
            .get(stream)
            .ok_or_else(|| no_such_group(stream, group))?;
        let group_state = state
            .groups
            .get(group)
            .ok_or_else(|| no_such_group(stream, group))?;
        let ids = group_state
            .consumers
            .get(consumer)
            .map(|pel| {
                pel.range((
                    std::ops::Bound::Excluded(after),
                    std::ops::Bound::Unbounded,
                ))
                .take(limit)
                .copied()
                .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchRead, LogError> {
        loop {
            // Register for wakeup before checking state so an append between
            // the check and the wait is never missed.
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(batch) = self.try_read_group(stream, group, consumer, limit)? {
                return Ok(BatchRead::Entries(batch));
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Ok(BatchRead::Interrupted),
            }
        }
    }

    async fn range_by_id(&self, stream: &str, id: EntryId) -> Result<Option<String>, LogError> {
        let streams = self.inner.lock();
        Ok(streams
            .get(stream)
            .and_then(|state| state.entries.get(&id))
            .cloned())
    }

    async fn ack(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, LogError> {
        let mut streams = self.inner.lock();
        let state = streams
            .get_mut(stream)
            .ok_or_else(|| no_such_group(stream, group))?;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| no_such_group(stream, group))?;
        let mut removed = 0;
        for pel in group_state.consumers.values_mut() {
            if pel.remove(&id) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
