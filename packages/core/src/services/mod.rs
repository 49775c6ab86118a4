//! Tree Services
//!
//! This module contains the structural logic of the resource tree:
//!
//! - `ResourceTreeService` - moves, positioning, branch deletion and creation
//! - `OrderingMaintainer` - dense `1..=N` sibling ordering and position validation
//! - `TreeNavigator` - subtree and ancestor traversals
//! - `build_subtree_struct` - flat traversal rows to nested subtree
//!
//! Services hold no connection state. Every operation receives the caller's
//! session and runs inside the caller's transaction.

pub mod error;
pub mod navigation;
pub mod ordering;
pub mod subtree_builder;
pub mod tree_service;

pub use error::TreeServiceError;
pub use navigation::TreeNavigator;
pub use ordering::{OrderingMaintainer, OrderingViolation, ReorderShift, MAX_POSITION, MIN_POSITION};
pub use subtree_builder::build_subtree_struct;
pub use tree_service::{ParentTarget, ResourceTreeService};
