//! Secret vault abstraction.
//!
//! A vault is a flat string-keyed map of secret strings. The credential
//! store layers account semantics on top; vaults know nothing about
//! accounts or primaries.

use std::sync::Arc;

use async_trait::async_trait;

mod file;
#[cfg(feature = "keyring")]
mod os_keyring;
mod memory;

pub use file::FileVault;
#[cfg(feature = "keyring")]
pub use os_keyring::KeyringVault;
pub use memory::MemoryVault;

/// Errors raised by vault backends.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vault contents could not be parsed.
    #[error("corrupt vault: {0}")]
    Corrupt(String),

    /// Backend-specific failure (keyring daemon, permissions, ...).
    #[error("{0}")]
    Backend(String),
}

/// Durable secret storage.
#[async_trait]
pub trait SecretVault: Send + Sync + std::fmt::Debug {
    /// Read a secret; `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError>;

    /// Create or overwrite a secret.
    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError>;

    /// Remove a secret. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), VaultError>;

    /// Enumerate every stored key.
    async fn keys(&self) -> Result<Vec<String>, VaultError>;
}

/// Shared vault for use across async contexts.
pub type SharedVault = Arc<dyn SecretVault>;
