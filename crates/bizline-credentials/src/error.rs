//! Error types for the credential store.

use crate::vault::VaultError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors that can occur in the credential store.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Caller supplied an unusable value (e.g. a blank account name).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No account is stored under this name.
    #[error("account '{0}' not found")]
    NotFound(String),

    /// The store holds no accounts at all.
    #[error("no accounts configured. Run 'bizline account link' first.")]
    NoAccounts,

    /// Underlying secret vault failed.
    #[error("Storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: VaultError,
    },

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CredentialError {
    pub(crate) fn storage(context: impl Into<String>, source: VaultError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Whether this error means the named account does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
