//! Key/value identity mapping.
//!
//! The broker records cross-platform message identities (correlation UUID →
//! platform message id) through this seam. Persistence is an external
//! concern; the in-memory implementation backs tests and single-process
//! runs.

use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Minimal get/set store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any existing one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Namespacing wrapper: every key becomes `prefix:key`.
pub struct Prefixed {
    inner: Arc<dyn KvStore>,
    prefix: String,
}

impl Prefixed {
    /// Wrap a store under a prefix.
    pub fn new(inner: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }
}

#[async_trait]
impl KvStore for Prefixed {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(&self.prefixed(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set(&self.prefixed(key), value).await
    }
}
