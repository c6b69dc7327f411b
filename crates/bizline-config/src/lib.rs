//! Configuration system for the bizline messaging CLI.
//!
//! Provides TOML-based configuration with:
//! - Messaging API endpoint settings (`[api]`)
//! - Credential store backend selection (`[store]`)
//! - Account-linking server tuning (`[setup]`)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, ConfigSource, LoadedConfig, load_config, load_config_file, xdg_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
