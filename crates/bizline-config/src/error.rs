//! Config errors.

/// Result alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Config loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is present but unusable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// No config directory could be determined for this platform.
    #[error("could not determine a config directory (set BIZLINE_CONFIG_DIR)")]
    NoConfigDir,
}
