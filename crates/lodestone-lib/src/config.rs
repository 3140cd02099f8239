//! Sync configuration.
//!
//! A single JSON file holds every option. It is read once per run and passed down
//! explicitly; nothing in the sync core reaches for process-wide settings.

use crate::api::modrinth::MODRINTH_API_BASE;
use crate::models::VersionType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Compatibility filter applied when choosing a target version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraints {
    pub game_version: String,
    pub loader: String,
    pub allowed_version_types: Vec<VersionType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Target mod loader, e.g. "fabric"
    pub loader: String,
    pub game_version: String,
    pub allowed_version_types: Vec<VersionType>,
    /// Number of fuzzy-search candidates inspected per archive
    pub search_depth: u32,
    pub mods_dir: PathBuf,
    /// File name of the local index, stored inside `mods_dir`
    pub index_file: String,
    pub concurrent_downloads: usize,
    pub api_base_url: String,
    pub user_agent: String,
    pub bulk_update_check: bool,
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            loader: "fabric".to_string(),
            game_version: "1.21.8".to_string(),
            allowed_version_types: vec![VersionType::Release, VersionType::Beta, VersionType::Alpha],
            search_depth: 5,
            mods_dir: PathBuf::from("mods"),
            index_file: ".modIndex.json".to_string(),
            concurrent_downloads: 10,
            api_base_url: MODRINTH_API_BASE.to_string(),
            user_agent: format!("lodestone/{}", env!("CARGO_PKG_VERSION")),
            bulk_update_check: false,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Load the config at `path`, writing the defaults there first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("[Config] Created default configuration at {:?}", path);
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SyncConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("[Config] Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "loader",
                reason: "must not be empty".to_string(),
            });
        }
        if self.game_version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "game_version",
                reason: "must not be empty".to_string(),
            });
        }
        if self.allowed_version_types.is_empty() {
            return Err(ConfigError::Invalid {
                field: "allowed_version_types",
                reason: "at least one of release, beta, alpha is required".to_string(),
            });
        }
        if self.search_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "search_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.concurrent_downloads == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrent_downloads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.index_file.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "index_file",
                reason: "must be a plain file name".to_string(),
            });
        }
        Ok(())
    }

    pub fn constraints(&self) -> VersionConstraints {
        VersionConstraints {
            game_version: self.game_version.clone(),
            loader: self.loader.clone(),
            allowed_version_types: self.allowed_version_types.clone(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.mods_dir.join(&self.index_file)
    }
}
