//! Config file discovery.
//!
//! Two optional TOML layers are merged: the user file
//! `<config dir>/config.toml`, then `bizline.toml` in the project directory.
//! Merging is per section; a section present in the project file replaces
//! the user's section whole, including fields it leaves unset.
//!
//! The config dir is `--config-dir`, else `BIZLINE_CONFIG_DIR`, else the
//! platform config dir.

use std::path::{Path, PathBuf};

use crate::{BizlineConfig, ConfigError, Result};

const USER_CONFIG_FILE: &str = "config.toml";
const PROJECT_CONFIG_FILE: &str = "bizline.toml";
const CONFIG_DIR_ENV: &str = "BIZLINE_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl ConfigLayer {
    fn file_in(self, dir: &Path) -> PathBuf {
        match self {
            ConfigLayer::User => dir.join(USER_CONFIG_FILE),
            ConfigLayer::Project => dir.join(PROJECT_CONFIG_FILE),
        }
    }
}

/// A config file that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    pub loaded: bool,
}

/// Merged configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BizlineConfig,
    /// Every file looked for, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Directory holding user-level state (credentials, logs).
    pub config_dir: PathBuf,
    /// Layers that existed but could not be used.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> impl Iterator<Item = &Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
    }
}

/// Discover, merge and validate configuration.
///
/// `project_dir` defaults to the working directory. `config_dir` overrides
/// `BIZLINE_CONFIG_DIR` and the platform default.
pub fn load_config(project_dir: Option<&Path>, config_dir: Option<&Path>) -> Result<LoadedConfig> {
    let config_dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => xdg_config_dir().ok_or(ConfigError::NoConfigDir)?,
    };
    let project_dir = project_dir.unwrap_or(Path::new("."));

    let mut loaded = LoadedConfig {
        config: BizlineConfig::new(),
        sources: Vec::with_capacity(2),
        config_dir,
        warnings: Vec::new(),
    };

    let layers = [
        (ConfigLayer::User, ConfigLayer::User.file_in(&loaded.config_dir)),
        (ConfigLayer::Project, ConfigLayer::Project.file_in(project_dir)),
    ];
    for (layer, path) in layers {
        let mut loaded_ok = false;
        if path.is_file() {
            match load_config_file(&path) {
                Ok(parsed) => {
                    loaded.config.merge(parsed);
                    loaded_ok = true;
                }
                // A broken layer is skipped rather than fatal.
                Err(e) => loaded
                    .warnings
                    .push(format!("Ignoring {}: {}", path.display(), e)),
            }
        }
        loaded.sources.push(ConfigSource {
            layer,
            path,
            loaded: loaded_ok,
        });
    }

    loaded.config.validate()?;
    Ok(loaded)
}

/// Parse a single config file.
pub fn load_config_file(path: &Path) -> Result<BizlineConfig> {
    std::fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })
        .and_then(|text| BizlineConfig::from_toml(&text))
}

/// User config directory: `BIZLINE_CONFIG_DIR`, else `<platform config dir>/bizline`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join("bizline")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        let loaded = load_config(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config, BizlineConfig::new());
        assert_eq!(loaded.loaded_from().count(), 0);
        assert_eq!(loaded.config_dir, user.path());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[setup]\ngrace_period_secs = 9\n\n[store]\nnamespace = \"home\"\n",
        )
        .unwrap();
        fs::write(
            project.path().join("bizline.toml"),
            "[setup]\ngrace_period_secs = 1\n",
        )
        .unwrap();

        let loaded = load_config(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.config.setup().grace_period_secs, 1);
        assert_eq!(loaded.config.store().namespace, "home");
        assert_eq!(loaded.loaded_from().count(), 2);
        assert_eq!(loaded.sources[0].layer, ConfigLayer::User);
    }

    #[test]
    fn test_project_section_replaces_user_section_whole() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[setup]\nopen_browser = false\ngrace_period_secs = 9\n",
        )
        .unwrap();
        fs::write(
            project.path().join("bizline.toml"),
            "[setup]\ngrace_period_secs = 1\n",
        )
        .unwrap();

        let loaded = load_config(Some(project.path()), Some(user.path())).unwrap();
        let setup = loaded.config.setup();
        assert_eq!(setup.grace_period_secs, 1);
        // Not carried over from the user file.
        assert!(setup.open_browser);
    }

    #[test]
    fn test_malformed_config_warns_but_continues() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(project.path().join("bizline.toml"), "not valid toml {{{{").unwrap();

        let loaded = load_config(Some(project.path()), Some(user.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Ignoring"));
    }

    #[test]
    fn test_non_loopback_bind_is_rejected() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        fs::write(project.path().join("bizline.toml"), "[setup]\nbind = \"0.0.0.0\"\n").unwrap();

        let err = load_config(Some(project.path()), Some(user.path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
