//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main msgbridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Stream names.
    #[serde(default)]
    pub streams: StreamsConfig,

    /// Dispatch/delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Attachment storage settings.
    #[serde(default)]
    pub attachments: AttachmentsConfig,
}

/// Names of the four relay streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    /// Incoming messages (remote platform → routing layer).
    #[serde(default = "default_incoming")]
    pub incoming: String,

    /// Outgoing messages (routing layer → remote platform).
    #[serde(default = "default_outgoing")]
    pub outgoing: String,

    /// Delegated tasks.
    #[serde(default = "default_task")]
    pub task: String,

    /// Task responses (shared broadcast stream).
    #[serde(default = "default_task_response")]
    pub task_response: String,
}

fn default_incoming() -> String {
    "bridge:incoming".to_string()
}

fn default_outgoing() -> String {
    "bridge:outgoing".to_string()
}

fn default_task() -> String {
    "bridge:task".to_string()
}

fn default_task_response() -> String {
    "bridge:task-response".to_string()
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            incoming: default_incoming(),
            outgoing: default_outgoing(),
            task: default_task(),
            task_response: default_task_response(),
        }
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Minimum interval between platform calls, in milliseconds.
    #[serde(default = "default_throttle_interval_ms")]
    pub throttle_interval_ms: u64,

    /// Retry bound for task-worker operations.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_throttle_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            throttle_interval_ms: default_throttle_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Attachment storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Root directory for fetched attachments.
    #[serde(default = "default_attachment_root")]
    pub root: PathBuf,

    /// MIME type assumed when sniffing fails and no hint is available.
    #[serde(default = "default_mime")]
    pub default_mime: String,
}

fn default_attachment_root() -> PathBuf {
    PathBuf::from("./files")
}

fn default_mime() -> String {
    "image/png".to_string()
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            root: default_attachment_root(),
            default_mime: default_mime(),
        }
    }
}
