//! Message envelope types relayed through the queue.
//!
//! An envelope is immutable once pushed: ingestion produces it, dispatch
//! consumes it, and nothing in between rewrites it.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Metadata shared by both relay directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Channel/room identifier on the remote platform.
    pub channel_id: String,

    /// Correlation UUID assigned at ingestion, carried end-to-end.
    pub uuid: Uuid,

    /// Platform message id being quoted/replied to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_id: Option<String>,
}

/// One typed part of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageComponent {
    /// Plain text.
    Text {
        /// Text content.
        body: String,
    },

    /// Reference to an attachment previously staged through the task queue.
    Attachment {
        /// Platform- or store-assigned attachment reference.
        reference: String,
    },

    /// Mention of another user.
    Mention {
        /// Platform user id.
        user_id: String,
        /// Display name at mention time.
        display: String,
    },
}

/// A message headed out to the remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Envelope metadata.
    pub metadata: MessageMetadata,

    /// Ordered message parts.
    pub components: Vec<MessageComponent>,
}

/// Information about the sender of an inbound message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderInfo {
    /// Platform user id.
    pub id: String,

    /// Display name.
    pub display_name: String,
}

/// A message received from the remote platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Envelope metadata.
    pub metadata: MessageMetadata,

    /// Timestamp when the platform event was received.
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Sender information.
    pub sender: SenderInfo,

    /// Ordered message parts.
    pub components: Vec<MessageComponent>,
}

/// An inbound platform event relayed through the incoming stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingEvent {
    /// A regular message.
    Message(IncomingMessage),

    /// A message retraction (recall/delete on the remote platform).
    Retraction {
        /// Channel/room the retraction happened in.
        channel_id: String,
        /// Platform id of the retracted message.
        retracted_id: String,
        /// Correlation UUID for the retraction event.
        uuid: Uuid,
    },
}

impl IncomingEvent {
    /// Compact one-line rendering for ingestion logs.
    pub fn summarize(&self) -> String {
        match self {
            IncomingEvent::Retraction {
                channel_id,
                retracted_id,
                ..
            } => {
                format!("[{channel_id}] message {retracted_id} retracted")
            }
            IncomingEvent::Message(msg) => {
                let mut out = format!(
                    "[{}] {}: ",
                    msg.metadata.channel_id, msg.sender.display_name
                );
                for part in &msg.components {
                    match part {
                        MessageComponent::Text { body } => out.push_str(body),
                        MessageComponent::Attachment { reference } => {
                            let _ = write!(out, "[attachment:{reference}]");
                        }
                        MessageComponent::Mention { display, .. } => {
                            let _ = write!(out, "@{display}");
                        }
                    }
                }
                out
            }
        }
    }
}
