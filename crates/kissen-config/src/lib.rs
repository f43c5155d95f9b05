//! Configuration management for Kissen
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (KISSEN_* prefix, highest precedence)
//! 2. kissen.local.toml (gitignored, local overrides)
//! 3. kissen.toml (git-tracked, server config)
//! 4. ~/.config/kissen/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Kissen configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KissenConfig {
    pub database: DatabaseConfig,
    pub permission: PermissionConfig,
    pub ban: BanConfig,
    pub logging: LoggingConfig,
}

/// Where meta tables are stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; nothing survives a restart.
    Memory,
    /// One DuckDB file per table under `data_dir`.
    DuckDb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::DuckDb,
            data_dir: PathBuf::from(".kissen/data"),
        }
    }
}

impl DatabaseConfig {
    /// Database file holding `table`.
    pub fn table_file(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{table}.duckdb"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub table: String,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            table: "kissen_permission_table".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanConfig {
    pub table: String,
}

impl Default for BanConfig {
    fn default() -> Self {
        Self {
            table: "kissen_ban_table".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}

impl KissenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from a specific server directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file without any layering
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create a development configuration
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                ansi: true,
            },
            ..Default::default()
        }
    }

    /// Create a production configuration
    pub fn production() -> Self {
        Self {
            database: DatabaseConfig {
                backend: StorageBackend::DuckDb,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                ansi: false,
            },
            ..Default::default()
        }
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.database.data_dir.is_relative() {
            self.database.data_dir = base.join(&self.database.data_dir);
        }
    }

    /// Checks values serde cannot reject on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, table) in [
            ("permission", &self.permission.table),
            ("ban", &self.ban.table),
        ] {
            if table.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{section}.table must not be empty"
                )));
            }
            if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::ValidationError(format!(
                    "{section}.table '{table}' may only contain letters, digits and '_'"
                )));
            }
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = KissenConfig::default();
        assert_eq!(config.database.backend, StorageBackend::DuckDb);
        assert_eq!(config.permission.table, "kissen_permission_table");
        assert_eq!(config.ban.table, "kissen_ban_table");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = KissenConfig::development();
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_production_config() {
        let config = KissenConfig::production();
        assert_eq!(config.database.backend, StorageBackend::DuckDb);
        assert!(!config.logging.ansi);
    }

    #[test]
    fn test_path_resolution() {
        let mut config = KissenConfig::default();
        config.resolve_paths("/srv/minecraft");

        assert_eq!(
            config.database.data_dir,
            PathBuf::from("/srv/minecraft/.kissen/data")
        );
        assert_eq!(
            config.database.table_file("kissen_ban_table"),
            PathBuf::from("/srv/minecraft/.kissen/data/kissen_ban_table.duckdb")
        );
    }

    #[test]
    fn test_absolute_paths_kept() {
        let mut config = KissenConfig::default();
        config.database.data_dir = PathBuf::from("/var/lib/kissen");
        config.resolve_paths("/srv/minecraft");
        assert_eq!(config.database.data_dir, PathBuf::from("/var/lib/kissen"));
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let mut config = KissenConfig::default();
        config.ban.table = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        config.ban.table = "bans; DROP TABLE x".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("kissen.toml");
        std::fs::write(
            &path,
            "[database]\nbackend = \"memory\"\n\n[logging]\nansi = false\n",
        )
        .expect("Failed to write config");

        let config = KissenConfig::from_file(&path).expect("Failed to read config");
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert!(!config.logging.ansi);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            KissenConfig::from_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[database\n").expect("Failed to write config");
        assert!(matches!(
            KissenConfig::from_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
