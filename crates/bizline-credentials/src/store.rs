//! Name-keyed account credential store with primary-account bookkeeping.
//!
//! Records are stored in a [`SecretVault`] under
//! `<namespace>:account:<normalized name>`. Names are trimmed and
//! case-folded, so "Shop" and " shop " address the same record.
//!
//! The primary flag lives on each record. Neither the auto-primary
//! decision in [`CredentialStore::set`] nor the fan-out in
//! [`CredentialStore::set_primary`] is transactional, so readers must
//! tolerate zero or several flagged records.

use chrono::Utc;

use crate::error::{CredentialError, Result};
use crate::types::{AccountInfo, Credentials, StoredCredentialRecord};
use crate::vault::SharedVault;

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "bizline";

const ACCOUNT_SEGMENT: &str = "account";

/// Trim and case-fold an account name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Multi-account credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    vault: SharedVault,
    namespace: String,
}

impl CredentialStore {
    /// Create a store in the default namespace.
    pub fn new(vault: SharedVault) -> Self {
        Self::with_namespace(vault, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(vault: SharedVault, namespace: impl Into<String>) -> Self {
        Self {
            vault,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn account_key(&self, normalized: &str) -> String {
        format!("{}:{}:{}", self.namespace, ACCOUNT_SEGMENT, normalized)
    }

    /// Extract the account name from a vault key, if the key belongs to us.
    fn parse_account_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.namespace.as_str())?;
        let rest = rest.strip_prefix(':')?;
        let name = rest.strip_prefix(ACCOUNT_SEGMENT)?.strip_prefix(':')?;
        if name.is_empty() { None } else { Some(name) }
    }

    fn validated_name(name: &str) -> Result<String> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(CredentialError::Validation(
                "account name must not be empty".to_string(),
            ));
        }
        Ok(normalized)
    }

    /// Store credentials for an account, replacing any existing record.
    ///
    /// The record becomes primary only when the store is currently empty.
    /// If the emptiness check itself fails the write still proceeds,
    /// with the record marked not primary.
    pub async fn set(&self, name: &str, credentials: Credentials, bot_label: &str) -> Result<()> {
        let name = Self::validated_name(name)?;

        let is_primary = match self.list().await {
            Ok(accounts) => accounts.is_empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list accounts; new account will not be primary");
                false
            }
        };

        let record = StoredCredentialRecord {
            credentials,
            created_at: Utc::now(),
            is_primary,
            bot_label: bot_label.to_string(),
        };

        self.vault
            .set(&self.account_key(&name), &record.encode()?)
            .await
            .map_err(|e| CredentialError::storage(format!("saving account '{}'", name), e))?;

        tracing::info!(account = %name, is_primary, "Account credentials saved");
        Ok(())
    }

    /// Fetch the full stored record for an account.
    pub async fn get_record(&self, name: &str) -> Result<StoredCredentialRecord> {
        let name = Self::validated_name(name)?;
        let raw = self
            .vault
            .get(&self.account_key(&name))
            .await
            .map_err(|e| CredentialError::storage(format!("reading account '{}'", name), e))?
            .ok_or_else(|| CredentialError::NotFound(name.clone()))?;
        StoredCredentialRecord::decode(&raw)
    }

    /// Fetch the credentials for an account.
    pub async fn get(&self, name: &str) -> Result<Credentials> {
        Ok(self.get_record(name).await?.credentials)
    }

    /// Remove an account. Removing an absent account succeeds.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = Self::validated_name(name)?;
        self.vault
            .delete(&self.account_key(&name))
            .await
            .map_err(|e| CredentialError::storage(format!("deleting account '{}'", name), e))?;
        tracing::info!(account = %name, "Account removed");
        Ok(())
    }

    /// List all accounts, sorted by name.
    ///
    /// Foreign keys are skipped. A record that cannot be read or decoded
    /// is reported as an unreadable, name-only entry.
    pub async fn list(&self) -> Result<Vec<AccountInfo>> {
        let keys = self
            .vault
            .keys()
            .await
            .map_err(|e| CredentialError::storage("listing accounts", e))?;

        let mut accounts = Vec::new();
        for key in &keys {
            let Some(name) = self.parse_account_key(key) else {
                continue;
            };
            let name = name.to_string();

            let raw = match self.vault.get(key).await {
                Ok(Some(raw)) => raw,
                // Removed between enumeration and read.
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(account = %name, error = %e, "Failed to read account record");
                    accounts.push(AccountInfo::unreadable(name));
                    continue;
                }
            };

            match StoredCredentialRecord::decode(&raw) {
                Ok(record) => accounts.push(AccountInfo::from_record(name, &record)),
                Err(e) => {
                    tracing::warn!(account = %name, error = %e, "Failed to decode account record");
                    accounts.push(AccountInfo::unreadable(name));
                }
            }
        }

        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }

    /// Make `name` the only primary account.
    ///
    /// Walks every record and rewrites only those whose flag changes. The
    /// walk is not atomic: a failure part-way leaves the flags as far as
    /// the walk got.
    pub async fn set_primary(&self, name: &str) -> Result<()> {
        let target = Self::validated_name(name)?;
        // NotFound before touching anything.
        self.get_record(&target).await?;

        let keys = self
            .vault
            .keys()
            .await
            .map_err(|e| CredentialError::storage("listing accounts", e))?;

        for key in &keys {
            let Some(account) = self.parse_account_key(key) else {
                continue;
            };
            let should_be_primary = account == target;

            let raw = match self.vault.get(key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    return Err(CredentialError::storage(
                        format!("reading account '{}'", account),
                        e,
                    ));
                }
            };
            let mut record = match StoredCredentialRecord::decode(&raw) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(account = %account, error = %e, "Skipping undecodable record");
                    continue;
                }
            };

            if record.is_primary == should_be_primary {
                continue;
            }
            record.is_primary = should_be_primary;
            self.vault
                .set(key, &record.encode()?)
                .await
                .map_err(|e| {
                    CredentialError::storage(format!("updating account '{}'", account), e)
                })?;
        }

        tracing::info!(account = %target, "Primary account changed");
        Ok(())
    }

    /// Name of the primary account, if any account exists.
    ///
    /// Returns the first flagged record in name order. When no record is
    /// flagged, the account with the earliest `created_at` wins (ties and
    /// unreadable records fall back to name order).
    pub async fn get_primary(&self) -> Result<Option<String>> {
        let accounts = self.list().await?;

        if let Some(primary) = accounts.iter().find(|a| a.is_primary) {
            return Ok(Some(primary.name.clone()));
        }

        let fallback = accounts
            .iter()
            .min_by(|a, b| match (a.created_at, b.created_at) {
                (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.name.cmp(&b.name),
            })
            .map(|a| a.name.clone());
        Ok(fallback)
    }

    /// Resolve the account a command should act on.
    ///
    /// An explicit name is looked up directly; otherwise the primary
    /// account is used. Returns the normalized name with its credentials.
    pub async fn resolve(&self, name: Option<&str>) -> Result<(String, Credentials)> {
        let name = match name {
            Some(name) => Self::validated_name(name)?,
            None => self.get_primary().await?.ok_or(CredentialError::NoAccounts)?,
        };
        let credentials = self.get(&name).await?;
        Ok((name, credentials))
    }
}
