//! OS keyring vault (macOS Keychain, Linux secret-service, Windows Credential Manager).
//!
//! Keyrings cannot enumerate entries, so the vault keeps an index entry
//! (`__index__`) holding the JSON list of stored keys.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SecretVault, VaultError};

const INDEX_USER: &str = "__index__";

/// Keyring-backed vault. Entries are stored as service=`service`, user=`key`.
#[derive(Debug)]
pub struct KeyringVault {
    service: String,
    lock: Mutex<()>,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            lock: Mutex::new(()),
        }
    }

    fn entry(&self, user: &str) -> Result<keyring::Entry, VaultError> {
        // Keep tests isolated from the local machine's keyring.
        if cfg!(test) {
            return Err(VaultError::Backend(
                "keyring access disabled in tests".to_string(),
            ));
        }
        keyring::Entry::new(&self.service, user)
            .map_err(|e| VaultError::Backend(format!("keyring error: {}", e)))
    }

    fn read(&self, user: &str) -> Result<Option<String>, VaultError> {
        match self.entry(user)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(VaultError::Backend(format!(
                "failed to read from keyring: {}",
                e
            ))),
        }
    }

    fn write(&self, user: &str, value: &str) -> Result<(), VaultError> {
        self.entry(user)?
            .set_password(value)
            .map_err(|e| VaultError::Backend(format!("failed to store in keyring: {}", e)))
    }

    fn remove(&self, user: &str) -> Result<(), VaultError> {
        match self.entry(user)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(VaultError::Backend(format!(
                "failed to delete from keyring: {}",
                e
            ))),
        }
    }

    fn load_index(&self) -> Result<Vec<String>, VaultError> {
        match self.read(INDEX_USER)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| VaultError::Corrupt(format!("keyring index: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    fn save_index(&self, keys: &[String]) -> Result<(), VaultError> {
        let raw = serde_json::to_string(keys)
            .map_err(|e| VaultError::Backend(format!("Failed to serialize index: {}", e)))?;
        self.write(INDEX_USER, &raw)
    }
}

#[async_trait]
impl SecretVault for KeyringVault {
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        self.read(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        let _guard = self.lock.lock();
        self.write(key, value)?;
        let mut index = self.load_index()?;
        if !index.iter().any(|k| k == key) {
            index.push(key.to_string());
            self.save_index(&index)?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), VaultError> {
        let _guard = self.lock.lock();
        self.remove(key)?;
        let mut index = self.load_index()?;
        let before = index.len();
        index.retain(|k| k != key);
        if index.len() != before {
            self.save_index(&index)?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, VaultError> {
        self.load_index()
    }
}
