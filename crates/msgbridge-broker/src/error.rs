//! Broker error types.

use msgbridge_queue::QueueError;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Delivery-substrate failure.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// HTTP request error during attachment fetch.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error (attachment store).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform adapter call failed.
    #[error("Platform error: {0}")]
    Platform(String),

    /// Attachment handling error.
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// A broker loop stopped abnormally (panic or abort).
    #[error("Loop aborted: {0}")]
    Aborted(String),
}

impl BrokerError {
    /// Create a platform error.
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Whether the underlying cause is the distinguished shutdown
    /// interruption.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BrokerError::Queue(q) if q.is_interrupted())
    }
}
