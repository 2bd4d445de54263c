//! Producer side of a stream.

use crate::log::{EntryId, StreamLog};
use crate::{QueueError, Result};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Appends serialized payloads to one named stream.
///
/// No ordering is guaranteed among concurrent producers beyond the
/// appended-before order assigned by the log, and failures are not retried
/// internally; they propagate to the caller.
pub struct Producer<T> {
    log: Arc<dyn StreamLog>,
    stream: String,
    _payload: PhantomData<fn(&T)>,
}

impl<T: Serialize> Producer<T> {
    /// Create a producer over its own log handle.
    pub fn new(log: Arc<dyn StreamLog>, stream: impl Into<String>) -> Self {
        Self {
            log,
            stream: stream.into(),
            _payload: PhantomData,
        }
    }

    /// The stream this producer appends to.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Durably append one payload; returns the log-assigned id.
    pub async fn push(&self, value: &T) -> Result<EntryId> {
        let payload = serde_json::to_string(value).map_err(QueueError::Encode)?;
        let id = self.log.append(&self.stream, payload).await?;
        debug!(stream = %self.stream, %id, "pushed entry");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLog;

    #[tokio::test]
    async fn test_push_returns_increasing_ids() {
        let log = Arc::new(MemoryLog::new());
        let producer: Producer<String> = Producer::new(log.clone(), "s");

        let a = producer.push(&"one".to_string()).await.unwrap();
        let b = producer.push(&"two".to_string()).await.unwrap();
        assert!(b > a);

        let stored = log.range_by_id("s", a).await.unwrap().unwrap();
        assert_eq!(stored, "\"one\"");
    }
}
