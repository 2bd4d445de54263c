//! Broker orchestration for msgbridge.
//!
//! Composes the delivery substrate from `msgbridge-queue` into the two relay
//! paths:
//!
//! - **Ingestion**: platform event → ordering-gate ticket → incoming stream,
//!   preserving the order handlers were started in even though they race.
//! - **Dispatch**: outgoing stream → global throttle → platform call →
//!   sent-acknowledgment, with poison entries logged and committed rather
//!   than retried forever.
//!
//! Plus the task worker that carries delegated attachment operations
//! (fetch/upload) under bounded retry, and an idempotent shutdown routine.

pub mod adapter;
pub mod attachment;
pub mod broker;
pub mod error;
pub mod kv;
pub mod throttle;
pub mod worker;

pub use adapter::{DeliveryReceipt, PlatformAdapter, UploadReceipt};
pub use attachment::{AttachmentStore, Fetcher};
pub use broker::{Broker, Ingestor, LogHandles, ShutdownSignal};
pub use error::BrokerError;
pub use kv::{KvStore, MemoryKvStore, Prefixed};
pub use throttle::Throttle;
pub use worker::TaskWorker;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
