//! In-memory vault for tests and ephemeral use.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SecretVault, VaultError};

/// In-memory vault. Keys enumerate in sorted order.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: RwLock<BTreeMap<String, String>>,
    write_count: AtomicU32,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls, for asserting write fan-out.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Insert a raw value, bypassing the write counter.
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), VaultError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, VaultError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
