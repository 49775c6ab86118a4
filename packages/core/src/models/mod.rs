//! Data Models
//!
//! This module contains the data structures shared by the storage and service layers:
//!
//! - `Resource` - The tree entity (id, parent, sibling ordering, tagged kind payload)
//! - `NewResource` - Insert parameters with optional id and position
//! - `TreeRow` / `SubtreeNode` - Flat traversal rows and their nested form

mod resource;
mod tree;

pub use resource::{NewResource, Resource, ResourceId, ResourceKind};
pub use tree::{
    parse_tree_path, sort_key_segment, SubtreeNode, TreeRow, SORT_KEY_WIDTH, TREE_PATH_SEPARATOR,
};
