//! Configuration types.
//!
//! ```toml
//! [api]
//! base_url = "https://api.line.me"
//! timeout_secs = 20
//!
//! [store]
//! backend = "file"
//! namespace = "bizline"
//!
//! [setup]
//! bind = "127.0.0.1"
//! grace_period_secs = 5
//! request_timeout_secs = 30
//! open_browser = true
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Environment variable overriding the messaging API base URL.
pub const API_BASE_ENV: &str = "BIZLINE_API_BASE";

/// Environment variable overriding the credential file location.
pub const STORE_PATH_ENV: &str = "BIZLINE_STORE_PATH";

/// Default messaging API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.line.me";

/// Default key namespace inside the secret vault.
pub const DEFAULT_NAMESPACE: &str = "bizline";

/// Default credential file name within the config directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BizlineConfig {
    /// Remote messaging API settings.
    pub api: Option<ApiConfig>,

    /// Credential store settings.
    pub store: Option<StoreConfig>,

    /// Account-linking server settings.
    pub setup: Option<SetupSection>,
}

impl BizlineConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: BizlineConfig) {
        if other.api.is_some() {
            self.api = other.api;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.setup.is_some() {
            self.setup = other.setup;
        }
    }

    /// Effective API section (defaults when absent).
    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    /// Effective store section (defaults when absent).
    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    /// Effective setup section (defaults when absent).
    pub fn setup(&self) -> SetupSection {
        self.setup.clone().unwrap_or_default()
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        self.setup().bind_addr()?;
        if self.store().namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.namespace".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API
// ─────────────────────────────────────────────────────────────────────────────

/// Messaging API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the messaging API.
    pub base_url: String,
    /// Outbound request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 20,
        }
    }
}

impl ApiConfig {
    /// Base URL, with `BIZLINE_API_BASE` taking precedence.
    pub fn effective_base_url(&self) -> String {
        if let Ok(url) = std::env::var(API_BASE_ENV)
            && !url.is_empty()
        {
            return url;
        }
        self.base_url.clone()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Which secret vault backs the credential store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON file with owner-only permissions.
    #[default]
    File,
    /// OS keyring (requires the `keyring` feature).
    Keyring,
}

/// Credential store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Key namespace; isolates accounts of different tool installations.
    pub namespace: String,
    /// Credential file path for the file backend.
    /// Default: `<config dir>/credentials.json`
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// Resolve the credential file path.
    ///
    /// Resolution order:
    /// 1. `BIZLINE_STORE_PATH` environment variable
    /// 2. Configured `path` value
    /// 3. `<config_dir>/credentials.json`
    pub fn effective_path(&self, config_dir: &std::path::Path) -> PathBuf {
        if let Ok(env_path) = std::env::var(STORE_PATH_ENV)
            && !env_path.is_empty()
        {
            return PathBuf::from(env_path);
        }
        self.path
            .clone()
            .unwrap_or_else(|| config_dir.join(CREDENTIALS_FILE))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Setup server
// ─────────────────────────────────────────────────────────────────────────────

/// Account-linking server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupSection {
    /// Loopback address to bind. The port is always OS-assigned.
    pub bind: String,
    /// Seconds in-flight requests get to finish before forced shutdown.
    pub grace_period_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Launch the default browser at the linking page.
    pub open_browser: bool,
}

impl Default for SetupSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            grace_period_secs: 5,
            request_timeout_secs: 30,
            open_browser: true,
        }
    }
}

impl SetupSection {
    /// Parse `bind`, rejecting anything that is not a loopback address.
    pub fn bind_addr(&self) -> Result<IpAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|_| ConfigError::InvalidValue {
            field: "setup.bind".to_string(),
            reason: format!("'{}' is not an IP address", self.bind),
        })?;
        if !ip.is_loopback() {
            return Err(ConfigError::InvalidValue {
                field: "setup.bind".to_string(),
                reason: format!("'{}' is not a loopback address", ip),
            });
        }
        Ok(ip)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
