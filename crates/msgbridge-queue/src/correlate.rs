//! Request/response correlation over shared task streams.
//!
//! A requester pushes a [`Task`] carrying a caller-generated UUID; a worker
//! somewhere consumes it and eventually broadcasts exactly one
//! [`TaskResponse`] with the same UUID on the shared response stream. Many
//! requesters poll that one stream concurrently, each filtering for its own
//! correlation id.

use crate::consumer::{Consumer, DEFAULT_CONSUMER};
use crate::log::{EntryId, StreamLog};
use crate::producer::Producer;
use crate::Result;
use msgbridge_core::id::short_id;
use msgbridge_core::types::{Task, TaskResponse};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Requester side of the task/response protocol.
pub struct TaskClient {
    tasks: Producer<Task>,
    responses: Consumer<TaskResponse>,
}

impl TaskClient {
    /// Create a client over a task producer and a response consumer.
    ///
    /// Responses are broadcast: each concurrent requester must use its own
    /// consumer *group* on the response stream, so every requester sees the
    /// full interleaved stream and filters it for its own correlation id.
    /// Sharing a group would load-balance responses away from their
    /// requesters.
    pub fn new(tasks: Producer<Task>, responses: Consumer<TaskResponse>) -> Self {
        Self { tasks, responses }
    }

    /// Create a client with a freshly minted consumer group on the response
    /// stream, guaranteeing the broadcast isolation `new` only documents.
    ///
    /// A unique group also means there is no recovery identity: responses
    /// pending for a crashed requester stay with its dead group. That is the
    /// intended trade; requesters re-submit rather than resume.
    pub fn with_unique_group(
        tasks: Producer<Task>,
        blocking: Arc<dyn StreamLog>,
        admin: Arc<dyn StreamLog>,
        response_stream: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        let group = format!("req-{}", short_id());
        let responses = Consumer::with_identity(
            blocking,
            admin,
            response_stream,
            group,
            DEFAULT_CONSUMER,
            cancel,
        );
        Self::new(tasks, responses)
    }

    /// Submit a task; returns the log id of the appended task entry.
    pub async fn submit(&self, task: &Task) -> Result<EntryId> {
        let id = self.tasks.push(task).await?;
        debug!(uuid = %task.uuid(), %id, "task submitted");
        Ok(id)
    }

    /// Poll the shared response stream until `matches` accepts a response.
    ///
    /// Every response is acknowledged immediately, matching or not: the
    /// stream serves many outstanding requests, and an unacked non-matching
    /// response would block other requesters' recovery. There is no built-in
    /// deadline; callers impose their own timeout.
    pub async fn poll_for<F>(&mut self, matches: F) -> Result<TaskResponse>
    where
        F: Fn(&TaskResponse) -> bool,
    {
        loop {
            let (id, response) = self.responses.next().await?;
            self.responses.commit(id).await?;
            if matches(&response) {
                return Ok(response);
            }
            debug!(uuid = %response.uuid, "skipping non-matching response");
        }
    }

    /// Poll until the response carrying `uuid` arrives.
    pub async fn poll_response(&mut self, uuid: Uuid) -> Result<TaskResponse> {
        self.poll_for(|response| response.uuid == uuid).await
    }
}
