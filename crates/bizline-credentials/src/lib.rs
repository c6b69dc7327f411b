//! Multi-account credential store for the bizline messaging CLI.
//!
//! # Components
//!
//! - [`vault`]: secret storage backends (file, OS keyring, in-memory)
//! - [`store`]: account records, name normalization, primary-account election
//! - [`types`]: credential and record types

pub mod error;
pub mod store;
pub mod types;
pub mod vault;

pub use error::{CredentialError, Result};
pub use store::{CredentialStore, DEFAULT_NAMESPACE, normalize_name};
pub use types::{AccountInfo, Credentials, StoredCredentialRecord};
#[cfg(feature = "keyring")]
pub use vault::KeyringVault;
pub use vault::{FileVault, MemoryVault, SecretVault, SharedVault, VaultError};
