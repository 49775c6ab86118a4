//! Resource Data Structures
//!
//! This module defines the `Resource` struct, the single entity that the
//! resource tree arranges into a hierarchy.
//!
//! # Architecture
//!
//! - **Common tree fields**: `id`, `parent_id` and `ordering` are the only fields the
//!   tree services read or write
//! - **Tagged kinds**: Resource subtypes are expressed by [`ResourceKind`], a serde-tagged
//!   enum stored alongside the common fields
//! - **Dense ordering**: `ordering` is the 1-based slot among siblings sharing `parent_id`
//!
//! # Examples
//!
//! ```rust
//! use ziggurat_core::models::{NewResource, ResourceKind};
//!
//! // A folder at the root level, appended after existing root resources
//! let folder = NewResource::new("Projects", ResourceKind::Folder);
//!
//! // An entry placed first under resource 7
//! let entry = NewResource::new(
//!     "Readme",
//!     ResourceKind::Entry {
//!         body: "Hello".to_string(),
//!     },
//! )
//! .with_parent(7)
//! .at_position(1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier type for resources
pub type ResourceId = i64;

/// Kind-specific payload of a resource.
///
/// Serialized with an internal `resource_type` tag so the SQL backend can store the
/// discriminator in its own column and the payload as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum ResourceKind {
    /// Plain container without payload
    Folder,

    /// Leaf resource carrying a text body
    Entry { body: String },

    /// Application-defined resource type with free-form properties
    Custom {
        type_name: String,
        #[serde(default)]
        properties: Value,
    },
}

impl ResourceKind {
    /// Discriminator stored in the `resource_type` column
    pub fn type_name(&self) -> &str {
        match self {
            ResourceKind::Folder => "folder",
            ResourceKind::Entry { .. } => "entry",
            ResourceKind::Custom { type_name, .. } => type_name,
        }
    }
}

/// A stored resource.
///
/// # Fields
///
/// - `id`: Unique stable identifier
/// - `parent_id`: Parent resource, `None` for root-level resources
/// - `ordering`: 1-based position among siblings sharing `parent_id`
/// - `resource_name`: Display name
/// - `kind`: Kind tag plus kind-specific payload
/// - `owner_user_id` / `owner_group_id`: Ownership references (opaque to the tree)
/// - `created_at`: Creation timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub parent_id: Option<ResourceId>,
    pub ordering: i64,
    pub resource_name: String,
    pub kind: ResourceKind,
    pub owner_user_id: Option<i64>,
    pub owner_group_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// True when the resource sits in the root sibling group
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Parameters for inserting a resource.
///
/// `id` may be supplied by the caller; when `None` the store generates one.
/// `ordering` is the requested sibling slot; when `None` the resource is appended
/// after the current last sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub id: Option<ResourceId>,
    pub parent_id: Option<ResourceId>,
    pub ordering: Option<i64>,
    pub resource_name: String,
    pub kind: ResourceKind,
    pub owner_user_id: Option<i64>,
    pub owner_group_id: Option<i64>,
}

impl NewResource {
    pub fn new(resource_name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: None,
            parent_id: None,
            ordering: None,
            resource_name: resource_name.into(),
            kind,
            owner_user_id: None,
            owner_group_id: None,
        }
    }

    pub fn with_id(mut self, id: ResourceId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent_id: ResourceId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn at_position(mut self, ordering: i64) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn owned_by_user(mut self, user_id: i64) -> Self {
        self.owner_user_id = Some(user_id);
        self
    }

    pub fn owned_by_group(mut self, group_id: i64) -> Self {
        self.owner_group_id = Some(group_id);
        self
    }

    /// Materialize the row once the store has settled the id and ordering
    pub fn into_resource(self, id: ResourceId, ordering: i64) -> Resource {
        Resource {
            id,
            parent_id: self.parent_id,
            ordering,
            resource_name: self.resource_name,
            kind: self.kind,
            owner_user_id: self.owner_user_id,
            owner_group_id: self.owner_group_id,
            created_at: Utc::now(),
        }
    }
}
