//! Runtime configuration for the resource tree
//!
//! `TreeConfig` carries storage settings for the libsql backend and the default
//! depth bound for navigation queries. It is serde-serializable so embedding
//! applications can keep it in their own settings files, and can be overlaid from
//! environment variables with [`TreeConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the database path
pub const ENV_DB_PATH: &str = "ZIGGURAT_DB_PATH";
/// Environment variable holding the SQLite busy timeout in milliseconds
pub const ENV_BUSY_TIMEOUT_MS: &str = "ZIGGURAT_BUSY_TIMEOUT_MS";
/// Environment variable holding the traversal depth bound
pub const ENV_MAX_DEPTH: &str = "ZIGGURAT_MAX_DEPTH";

/// Configuration for tree storage and traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Database file used by the libsql backend
    pub database_path: PathBuf,

    /// How long a session waits for the database write lock before failing
    pub busy_timeout_ms: u64,

    /// Enable Write-Ahead Logging on the database file
    pub wal_mode: bool,

    /// Default depth bound for service navigation calls that pass no bound of their own.
    /// `None` walks the whole tree. Cycle checks and branch deletes ignore it.
    pub max_depth: Option<u32>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("ziggurat.db"),
            busy_timeout_ms: 5000,
            wal_mode: true,
            max_depth: None,
        }
    }
}

impl TreeConfig {
    /// Default configuration pointed at `database_path`
    pub fn with_database_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `ZIGGURAT_*` environment variables
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(raw) = std::env::var(ENV_BUSY_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(ms) => config.busy_timeout_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_BUSY_TIMEOUT_MS, raw),
            }
        }

        if let Ok(raw) = std::env::var(ENV_MAX_DEPTH) {
            match raw.parse::<u32>() {
                Ok(depth) => config.max_depth = Some(depth),
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_MAX_DEPTH, raw),
            }
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path cannot be empty".to_string());
        }

        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than 0".to_string());
        }

        if self.max_depth == Some(0) {
            return Err("max_depth must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
