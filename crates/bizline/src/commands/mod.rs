//! CLI command handlers.

pub mod account;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bizline_config::{BizlineConfig, StoreBackend};
use bizline_credentials::{CredentialStore, FileVault, SharedVault};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: BizlineConfig,
    /// User-level state directory (credentials, logs).
    pub config_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Open the credential store selected by `[store]`.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let store_config = self.config.store();
        let vault: SharedVault = match store_config.backend {
            StoreBackend::File => {
                let path = store_config.effective_path(&self.config_dir);
                tracing::debug!(path = %path.display(), "Using file credential vault");
                Arc::new(FileVault::new(path))
            }
            StoreBackend::Keyring => keyring_vault(&store_config.namespace)?,
        };
        Ok(CredentialStore::with_namespace(vault, store_config.namespace))
    }
}

#[cfg(feature = "keyring")]
fn keyring_vault(service: &str) -> Result<SharedVault> {
    Ok(Arc::new(bizline_credentials::KeyringVault::new(service)))
}

#[cfg(not(feature = "keyring"))]
fn keyring_vault(_service: &str) -> Result<SharedVault> {
    anyhow::bail!("store.backend = \"keyring\" requires bizline built with the `keyring` feature")
}
