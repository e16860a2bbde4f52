//! Campus Connect - Configuration
//!
//! Where the favorites database and legacy lists live, plus logging defaults.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{CampusError, CampusResult};

/// Application directory name
pub const APP_DIR: &str = "campus_connect";

/// App configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding all persisted state
    pub data_dir: PathBuf,
    /// SQLite file for structured favorites (relative to `data_dir`)
    pub database_file: String,
    /// Legacy flat-list file (relative to `data_dir`)
    pub legacy_file: String,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Rewrite display-name keys to stable ids at startup
    pub canonicalize_keys: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: "favorites.db".into(),
            legacy_file: "legacy_favorites.json".into(),
            log_level: "info".into(),
            canonicalize_keys: true,
        }
    }
}

impl AppConfig {
    /// Config rooted at a specific directory
    pub fn with_data_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Load config from a JSON file, falling back to defaults when absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> CampusResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read(path)?;
        serde_json::from_slice(&data)
            .map_err(|e| CampusError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CampusResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Full path of the favorites database
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Full path of the legacy flat-list file
    pub fn legacy_path(&self) -> PathBuf {
        self.data_dir.join(&self.legacy_file)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./campus_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("nope.json")).unwrap();

        assert_eq!(config.database_file, "favorites.db");
        assert!(config.canonicalize_keys);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "log_level": "debug", "canonicalize_keys": false }"#).unwrap();

        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.canonicalize_keys);
        assert_eq!(config.legacy_file, "legacy_favorites.json");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = AppConfig::with_data_dir(dir.path());
        config.save(&path).unwrap();

        let loaded = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.data_dir, dir.path());
        assert_eq!(loaded.database_path(), dir.path().join("favorites.db"));
    }

    #[test]
    fn test_garbage_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            AppConfig::load_or_default(&path),
            Err(CampusError::Config(_))
        ));
    }
}
