//! Attachment fetch pipeline: download, MIME resolution, local storage.

use crate::Result;
use image::ImageReader;
use msgbridge_core::types::StoredFile;
use msgbridge_queue::retry;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// On-disk store for fetched attachments.
///
/// Files are laid out flat as `<uuid>.<ext>`, with the extension derived
/// from the resolved MIME type.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    /// Open a store, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a stored file lives at.
    pub fn path_for(&self, file: &StoredFile) -> PathBuf {
        let ext = mime_guess::get_mime_extensions_str(&file.mime)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        self.root.join(format!("{}.{}", file.uuid, ext))
    }

    /// Write a file's bytes; returns the path written.
    pub async fn write(&self, file: &StoredFile, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(file);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// Detect a MIME type from content by decoding, the only source that cannot
/// lie. `None` when the payload is not a recognized image format.
pub fn sniff_mime(bytes: &[u8]) -> Option<String> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    reader
        .format()
        .map(|format| format.to_mime_type().to_string())
}

/// Resolve the MIME type for a payload.
///
/// The sniffed type wins; a disagreeing hint is logged but never fails the
/// operation. When sniffing fails, the hint is used if present, else the
/// fixed default.
pub fn resolve_mime(bytes: &[u8], hint: Option<&str>, default_mime: &str) -> String {
    match sniff_mime(bytes) {
        Some(sniffed) => {
            if let Some(hint) = hint {
                if !hint.eq_ignore_ascii_case(&sniffed) {
                    warn!(hint, %sniffed, "MIME hint disagrees with sniffed type; sniffed wins");
                }
            }
            sniffed
        }
        None => match hint {
            Some(hint) => {
                warn!(hint, "MIME sniff failed; falling back to hint");
                hint.to_ascii_lowercase()
            }
            None => {
                warn!(default_mime, "MIME sniff failed with no hint; using default");
                default_mime.to_string()
            }
        },
    }
}

/// Downloads remote attachments into an [`AttachmentStore`] under bounded
/// retry.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    store: AttachmentStore,
    default_mime: String,
    max_retries: u32,
}

impl Fetcher {
    /// Create a fetcher writing through `store`.
    pub fn new(store: AttachmentStore, default_mime: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            store,
            default_mime: default_mime.into(),
            max_retries,
        }
    }

    /// The store this fetcher writes through.
    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    /// Download `url`, resolve its MIME type, and store it under `uuid`.
    ///
    /// The HTTP `Content-Type` header, when present, takes the hint slot
    /// ahead of the caller-declared `mime_hint`. Retry exhaustion surfaces
    /// as the queue crate's retry-limit error for the worker to convert.
    pub async fn fetch(
        &self,
        uuid: Uuid,
        url: &str,
        mime_hint: Option<&str>,
    ) -> Result<StoredFile> {
        debug!(%uuid, url, "downloading attachment");

        let (bytes, header_mime) = retry(
            || async {
                let response = self.client.get(url).send().await?.error_for_status()?;
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| {
                        value
                            .split(';')
                            .next()
                            .unwrap_or(value)
                            .trim()
                            .to_ascii_lowercase()
                    });
                let bytes = response.bytes().await?;
                Ok::<_, reqwest::Error>((bytes, mime))
            },
            self.max_retries,
        )
        .await?;

        let hint = header_mime.as_deref().or(mime_hint);
        let mime = resolve_mime(&bytes, hint, &self.default_mime);
        let file = StoredFile { uuid, mime };
        let path = self.store.write(&file, &bytes).await?;
        debug!(%uuid, mime = %file.mime, path = %path.display(), "attachment stored");
        Ok(file)
    }
}
