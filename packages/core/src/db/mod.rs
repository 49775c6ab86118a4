//! Database Layer
//!
//! This module handles all persistence of tree resources:
//!
//! - `NodeStore` / `NodeSession` - the storage contract the tree services consume
//! - `TursoStore` - embedded libsql (SQLite) backend with recursive SQL queries
//! - `MemoryStore` - in-process backend, used in tests and for ephemeral trees
//!
//! # Architecture
//!
//! Services never open transactions themselves. Callers obtain a session from a
//! `NodeStore`, pass it explicitly to every tree operation, and commit or roll back
//! when done. Both backends support the complete feature set and produce identical
//! traversal rows.

mod database;
mod error;
mod memory_store;
mod node_store;
mod turso_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use memory_store::{MemorySession, MemoryStore};
pub use node_store::{NodeSession, NodeStore, PositionRange};
pub use turso_store::{TursoSession, TursoStore};
