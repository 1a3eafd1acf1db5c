//! Persisted application preferences.
//!
//! Settings live in a TOML file under the app root directory. Every field
//! carries a serde default so configs written by older builds keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::updater::REPO_SLUG;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Aggregate application settings loaded from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub updates: UpdateSettings,
}

/// Persisted preferences for update checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// Run a silent check when the host starts.
    #[serde(default = "default_true")]
    pub check_on_startup: bool,
    /// GitHub repository slug (`OWNER/REPO`) the release feed is read from.
    #[serde(default = "default_repo")]
    pub repo: String,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            check_on_startup: true,
            repo: default_repo(),
        }
    }
}

/// Errors that may occur while loading or saving app configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if the file is missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    if path.exists() {
        load_from(&path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific TOML file.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Persist configuration to disk, overwriting any previous contents.
pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_to_path(config, &path)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_repo() -> String {
    REPO_SLUG.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_check_on_startup_and_canonical_repo() {
        let settings = UpdateSettings::default();
        assert!(settings.check_on_startup);
        assert_eq!(settings.repo, REPO_SLUG);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = AppConfig::default();
        config.updates.check_on_startup = false;
        config.updates.repo = "acme/loancalc".to_string();

        save_to_path(&config, &path).unwrap();
        let loaded = load_from(&path).unwrap();
        assert!(!loaded.updates.check_on_startup);
        assert_eq!(loaded.updates.repo, "acme/loancalc");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[updates]\ncheck_on_startup = false\n").unwrap();

        let loaded = load_from(&path).unwrap();
        assert!(!loaded.updates.check_on_startup);
        assert_eq!(loaded.updates.repo, REPO_SLUG);
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "updates = not-a-table").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }
}
