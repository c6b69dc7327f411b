//! File-backed vault.
//!
//! All secrets live in one JSON object on disk. Every write rewrites the
//! file through a temp file and rename so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SecretVault, VaultError};

/// File-based vault for production use.
#[derive(Debug)]
pub struct FileVault {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileVault {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, VaultError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| VaultError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| VaultError::Backend(format!("Failed to serialize vault: {}", e)))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string());
        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        std::fs::write(&tmp, json)?;
        restrict_permissions(&tmp)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl SecretVault for FileVault {
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)?;
        tracing::debug!(path = %self.path.display(), "Vault entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), VaultError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, VaultError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_keys().collect())
    }
}
