//! Database Connection Management
//!
//! This module provides the database connection and schema initialization for the
//! libsql (embedded SQLite) backend.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid database path from [`TreeConfig`]
//! - **WAL mode**: Write-Ahead Logging for better read concurrency (configurable)
//! - **Foreign keys**: Enabled per connection so `parent_id` always references a stored resource
//! - **Busy timeout**: Sessions wait for the write lock instead of failing with `SQLITE_BUSY`
//!
//! # Database Connection Patterns
//!
//! Use `connect_with_timeout()` for every connection. It applies the busy timeout and
//! foreign key pragmas, which SQLite scopes to a single connection.
//!
//! ```no_run
//! # use ziggurat_core::db::DatabaseService;
//! # use ziggurat_core::config::TreeConfig;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(TreeConfig::with_database_path("./data/tree.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::TreeConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::Path;
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Configuration the service was opened with
    pub config: TreeConfig,
}

impl DatabaseService {
    /// Open (or create) the database described by `config`
    ///
    /// This will:
    /// 1. Validate the configuration
    /// 2. Ensure the parent directory exists (create if needed)
    /// 3. Open/create the database file
    /// 4. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - The configuration is invalid
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(config: TreeConfig) -> Result<Self, DatabaseError> {
        config.validate().map_err(DatabaseError::InvalidConfig)?;

        let db_path = config.database_path.clone();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            config,
        };
        service.initialize_schema().await?;

        tracing::info!("Resource tree database ready at {}", db_path.display());
        Ok(service)
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.config.database_path
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema
    ///
    /// Idempotent (safe to call multiple times).
    ///
    /// # Schema
    ///
    /// - `resources` table: id, parent reference, sibling ordering, kind discriminator and
    ///   JSON payload, ownership references. The parent reference does not cascade:
    ///   branch deletes list every id, so the change count covers the whole branch.
    /// - `(parent_id, ordering)` index: serves every sibling-group query and shift. Not
    ///   UNIQUE, since SQLite checks uniqueness row by row while a shift is running.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        if self.config.wal_mode {
            self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
                .await?;
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS resources (
                resource_id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES resources(resource_id),
                ordering INTEGER NOT NULL CHECK (ordering >= 1),
                resource_name TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                payload JSON NOT NULL DEFAULT '{}',
                owner_user_id INTEGER,
                owner_group_id INTEGER,
                created_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create resources table: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_resources_parent_ordering
             ON resources(parent_id, ordering)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create parent/ordering index: {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_resources_type ON resources(resource_type)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create type index: {}", e))
        })?;

        Ok(())
    }

    /// Open a connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::connection_failed(self.config.database_path.clone(), e))?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.config.busy_timeout_ms),
        )
        .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_new_creates_schema_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("tree.db");

        let service = DatabaseService::new(TreeConfig::with_database_path(&db_path))
            .await
            .unwrap();
        assert!(db_path.exists());

        let conn = service.connect_with_timeout().await.unwrap();
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'resources'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().expect("resources table missing");
        let name: String = row.get(0).unwrap();
        assert_eq!(name, "resources");
    }

    #[tokio::test]
    async fn test_initialize_schema_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeConfig::with_database_path(temp_dir.path().join("tree.db"));

        DatabaseService::new(config.clone()).await.unwrap();
        let reopened = DatabaseService::new(config).await;
        assert!(reopened.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = TreeConfig::default();
        config.busy_timeout_ms = 0;

        let result = DatabaseService::new(config).await;
        assert!(matches!(result, Err(DatabaseError::InvalidConfig(_))));
    }
}
