//! Delegated-task contracts.
//!
//! Tasks carry blocking, side-effecting operations (attachment fetch/upload)
//! to a worker loop; each accepted task yields exactly one response carrying
//! the same correlation UUID. Delivery is at-least-once, so task execution
//! must tolerate duplicates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Handle to a fetched attachment in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Stable id; doubles as the on-disk file stem.
    pub uuid: Uuid,

    /// Resolved MIME type.
    pub mime: String,
}

/// A delegated operation consumed by the task worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Task {
    /// Download a remote attachment into the local store.
    FetchAttachment {
        /// Correlation UUID.
        uuid: Uuid,
        /// Source URL.
        url: String,
        /// Caller-declared MIME hint, used when sniffing fails.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_hint: Option<String>,
    },

    /// Upload a previously fetched attachment to the remote platform.
    UploadAttachment {
        /// Correlation UUID.
        uuid: Uuid,
        /// The stored file to upload.
        file: StoredFile,
        /// Platform target (channel/room id).
        target: String,
    },
}

impl Task {
    /// The correlation UUID linking this task to its response.
    pub fn uuid(&self) -> Uuid {
        match self {
            Task::FetchAttachment { uuid, .. } => *uuid,
            Task::UploadAttachment { uuid, .. } => *uuid,
        }
    }
}

/// Operation-specific output of a successful task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    /// An attachment landed in the local store.
    Fetched {
        /// Store handle.
        file: StoredFile,
    },

    /// An attachment was uploaded to the remote platform.
    Uploaded {
        /// Platform-assigned attachment id.
        attachment_id: String,
        /// Platform URL for the uploaded attachment.
        url: String,
    },

    /// An outgoing message was delivered.
    Sent {
        /// Platform-assigned message id.
        message_id: String,
    },
}

/// Result carried by a task response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskResult {
    /// The operation completed.
    Success {
        /// Operation-specific output.
        output: TaskOutput,
    },

    /// The operation failed; the reason is human-readable and travels
    /// end-to-end to the original requester.
    Error {
        /// Failure description.
        reason: String,
    },
}

/// Response to a [`Task`], broadcast on the shared response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Correlation UUID copied from the task.
    pub uuid: Uuid,

    /// Outcome.
    pub result: TaskResult,
}

impl TaskResponse {
    /// Build a success response.
    pub fn success(uuid: Uuid, output: TaskOutput) -> Self {
        Self {
            uuid,
            result: TaskResult::Success { output },
        }
    }

    /// Build an error response.
    pub fn error(uuid: Uuid, reason: impl Into<String>) -> Self {
        Self {
            uuid,
            result: TaskResult::Error {
                reason: reason.into(),
            },
        }
    }

    /// Whether this response reports success.
    pub fn is_success(&self) -> bool {
        matches!(self.result, TaskResult::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_uuid() {
        let uuid = Uuid::new_v4();
        let task = Task::FetchAttachment {
            uuid,
            url: "http://example.com/img".to_string(),
            mime_hint: None,
        };
        assert_eq!(task.uuid(), uuid);
    }

    #[test]
    fn test_response_encoding() {
        let uuid = Uuid::new_v4();
        let resp = TaskResponse::error(uuid, "download failed");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["result"]["type"], "error");
        assert_eq!(json["result"]["reason"], "download failed");

        let back: TaskResponse = serde_json::from_value(json).unwrap();
        assert!(!back.is_success());
        assert_eq!(back.uuid, uuid);
    }

    #[test]
    fn test_task_round_trip() {
        let task = Task::UploadAttachment {
            uuid: Uuid::new_v4(),
            file: StoredFile {
                uuid: Uuid::new_v4(),
                mime: "image/png".to_string(),
            },
            target: "room-1".to_string(),
        };
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.uuid(), task.uuid());
    }
}
