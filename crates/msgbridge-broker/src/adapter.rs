//! Platform adapter seam.
//!
//! The adapter holds the live protocol session with one chat platform and
//! turns envelopes into platform API calls. It is implemented outside this
//! crate; the broker only depends on this trait.

use crate::Result;
use async_trait::async_trait;
use msgbridge_core::types::{OutgoingMessage, StoredFile};
use std::fmt::Debug;
use std::path::Path;

/// Result of a successful message delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Platform-assigned message id.
    pub message_id: String,
}

/// Result of a successful attachment upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Platform-assigned attachment id.
    pub attachment_id: String,

    /// Platform URL for the uploaded attachment.
    pub url: String,
}

/// A live session with one chat platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync + Debug {
    /// Deliver one outgoing message. Transient failures should be returned,
    /// not retried internally; the broker owns the retry policy.
    async fn deliver(&self, message: &OutgoingMessage) -> Result<DeliveryReceipt>;

    /// Upload a locally stored attachment to the platform, targeting a
    /// channel/room.
    async fn upload_attachment(
        &self,
        path: &Path,
        file: &StoredFile,
        target: &str,
    ) -> Result<UploadReceipt>;
}
