//! Credential and account record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credentials for one messaging channel.
///
/// `Debug` redacts every secret so records can be traced safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub bearer_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_secret: Option<String>,
}

impl Credentials {
    /// Credentials holding only a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: token.into(),
            channel_id: None,
            channel_secret: None,
        }
    }

    pub fn with_channel(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.channel_id = Some(id.into());
        self.channel_secret = Some(secret.into());
        self
    }

    /// Masked form of the bearer token for operator display.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.bearer_token.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "****".to_string()
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"***")
            .field("channel_id", &self.channel_id)
            .field("channel_secret", &self.channel_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Persisted envelope for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentialRecord {
    pub credentials: Credentials,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub bot_label: String,
}

impl StoredCredentialRecord {
    pub(crate) fn encode(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::CredentialError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(raw: &str) -> crate::Result<Self> {
        serde_json::from_str(raw).map_err(|e| crate::CredentialError::Serialization(e.to_string()))
    }
}

/// Read projection of a stored account, produced by listing.
///
/// A record that failed to decode is reported with only its name:
/// `created_at` is `None` and `readable` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub is_primary: bool,
    pub bot_label: String,
    pub readable: bool,
}

impl AccountInfo {
    pub(crate) fn from_record(name: String, record: &StoredCredentialRecord) -> Self {
        Self {
            name,
            created_at: Some(record.created_at),
            is_primary: record.is_primary,
            bot_label: record.bot_label.clone(),
            readable: true,
        }
    }

    pub(crate) fn unreadable(name: String) -> Self {
        Self {
            name,
            created_at: None,
            is_primary: false,
            bot_label: String::new(),
            readable: false,
        }
    }
}
