//! Ziggurat Core - Hierarchical Resource Tree
//!
//! This crate keeps resources in a single ordered tree and provides the structural
//! operations on it: moving resources between positions and parents, deleting whole
//! branches, and retrieving flat or nested subtrees.
//!
//! # Architecture
//!
//! - **Dense sibling ordering**: siblings under one parent always hold positions `1..=N`
//! - **Caller-owned transactions**: every operation runs on a session from a [`db::NodeStore`]
//! - **Lock, validate, mutate**: a failed validation never leaves partial writes behind
//! - **libsql/Turso**: embedded SQLite backend with recursive CTE traversals, plus an
//!   in-memory backend with identical semantics
//!
//! # Modules
//!
//! - [`models`] - Data structures (Resource, TreeRow, SubtreeNode)
//! - [`services`] - Tree services (ResourceTreeService, OrderingMaintainer, TreeNavigator)
//! - [`db`] - Storage contract and backends
//! - [`config`] - Store and service configuration
//! - [`logging`] - Tracing subscriber setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::TreeConfig;
pub use models::*;
pub use services::*;
