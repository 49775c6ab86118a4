//! Resource Tree Service - Structural Operations
//!
//! This module provides the state-changing API of the resource tree:
//!
//! - Moves within a sibling group and across branches (`move_to_position`)
//! - Positioning of freshly inserted resources (`set_position`, `create_resource`)
//! - Branch deletion (`delete_branch`)
//! - Navigation and subtree assembly entry points
//!
//! # Transactions and locking
//!
//! Every method takes an explicit `&mut` session from the caller. Mutations follow the
//! same sequence: lock the resource with `get_for_update()`, run every validation,
//! and only then shift siblings and write the resource. A validation failure therefore
//! leaves the session untouched; whether to roll back is the caller's decision.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ziggurat_core::db::{MemoryStore, NodeSession, NodeStore};
//! use ziggurat_core::models::{NewResource, ResourceKind};
//! use ziggurat_core::services::{ParentTarget, ResourceTreeService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let service = ResourceTreeService::new();
//!
//!     let mut session = store.begin().await?;
//!     let folder = service
//!         .create_resource(&mut session, NewResource::new("Docs", ResourceKind::Folder))
//!         .await?;
//!     let page = service
//!         .create_resource(&mut session, NewResource::new("Intro", ResourceKind::Folder))
//!         .await?;
//!
//!     // Move "Intro" into "Docs" as its first child
//!     service
//!         .move_to_position(&mut session, page.id, 1, ParentTarget::Resource(folder.id))
//!         .await?;
//!     session.commit().await?;
//!
//!     Ok(())
//! }
//! ```

use crate::config::TreeConfig;
use crate::db::NodeSession;
use crate::models::{NewResource, Resource, ResourceId, SubtreeNode, TreeRow};
use crate::services::error::TreeServiceError;
use crate::services::navigation::TreeNavigator;
use crate::services::ordering::{OrderingMaintainer, OrderingViolation};
use crate::services::subtree_builder::build_subtree_struct;
use std::collections::BTreeMap;

/// Destination parent of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentTarget {
    /// Stay in the current sibling group
    #[default]
    Unchanged,
    /// Become a root-level resource
    Root,
    /// Become a child of the given resource
    Resource(ResourceId),
}

impl ParentTarget {
    /// Resolve against the current parent of the moved resource
    pub fn resolve(self, current_parent: Option<ResourceId>) -> Option<ResourceId> {
        match self {
            ParentTarget::Unchanged => current_parent,
            ParentTarget::Root => None,
            ParentTarget::Resource(id) => Some(id),
        }
    }
}

impl From<Option<ResourceId>> for ParentTarget {
    fn from(parent_id: Option<ResourceId>) -> Self {
        match parent_id {
            Some(id) => ParentTarget::Resource(id),
            None => ParentTarget::Root,
        }
    }
}

/// Structural operations on the resource tree
#[derive(Debug, Clone, Default)]
pub struct ResourceTreeService {
    /// Depth bound applied to navigation calls that do not pass one
    default_max_depth: Option<u32>,
}

impl ResourceTreeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &TreeConfig) -> Self {
        Self {
            default_max_depth: config.max_depth,
        }
    }

    fn depth_or_default(&self, max_depth: Option<u32>) -> Option<u32> {
        max_depth.or(self.default_max_depth)
    }

    async fn lock_resource<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
    ) -> Result<Resource, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        session
            .get_for_update(node_id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(node_id))
    }

    //
    // VALIDATION
    //

    /// Check that `new_parent_id` may become the parent of `node_id`
    ///
    /// Fails with `NodeNotFound` when the parent does not exist and with
    /// `CycleDetected` when it is the resource itself or one of its descendants.
    /// The new parent is locked for update. `None` (root level) always passes.
    pub async fn check_node_parent<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        new_parent_id: Option<ResourceId>,
    ) -> Result<(), TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let Some(parent_id) = new_parent_id else {
            return Ok(());
        };

        if parent_id == node_id {
            return Err(TreeServiceError::cycle_detected(node_id, parent_id));
        }

        if session.get_for_update(parent_id).await?.is_none() {
            return Err(TreeServiceError::node_not_found(parent_id));
        }

        if TreeNavigator::is_within_branch(session, node_id, parent_id).await? {
            tracing::warn!(
                "Rejected move of resource {} under its descendant {}",
                node_id,
                parent_id
            );
            return Err(TreeServiceError::cycle_detected(node_id, parent_id));
        }

        Ok(())
    }

    /// Validate `position` against the current children of `parent_id`
    pub async fn check_node_position<S>(
        &self,
        session: &mut S,
        parent_id: Option<ResourceId>,
        position: i64,
        on_same_branch: bool,
    ) -> Result<(), TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        OrderingMaintainer::check_position(session, parent_id, position, on_same_branch).await
    }

    /// Number of direct children of `parent_id` (root resources for `None`)
    pub async fn count_children<S>(
        &self,
        session: &mut S,
        parent_id: Option<ResourceId>,
    ) -> Result<i64, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        Ok(session.children_count(parent_id).await?)
    }

    //
    // MUTATIONS
    //

    /// Insert a resource, appending it or opening a gap at the requested position
    pub async fn create_resource<S>(
        &self,
        session: &mut S,
        resource: NewResource,
    ) -> Result<Resource, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let parent_id = resource.parent_id;
        if let Some(parent_id) = parent_id {
            if session.get_for_update(parent_id).await?.is_none() {
                return Err(TreeServiceError::node_not_found(parent_id));
            }
        }

        let count = session.children_count(parent_id).await?;
        let ordering = resource.ordering.unwrap_or(count + 1);
        OrderingMaintainer::validate_position(ordering, count, false)?;

        if ordering <= count {
            OrderingMaintainer::shift_up(session, parent_id, ordering).await?;
        }
        let created = session.insert(resource, ordering).await?;

        tracing::debug!(
            "Created resource {} under {:?} at position {}",
            created.id,
            parent_id,
            ordering
        );
        Ok(created)
    }

    /// Move `node_id` to `to_position`, optionally under a new parent
    ///
    /// With an unchanged parent this reorders the sibling group; moving to the
    /// current position is a no-op. With a new parent the gap at the old location is
    /// closed and one is opened at the new location.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if `node_id` or the new parent does not exist
    /// - `CycleDetected` if the new parent lies within the moved branch
    /// - `OutOfBoundary` if `to_position` is outside `1..=count` (same parent) or
    ///   `1..=count + 1` (new parent)
    pub async fn move_to_position<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        to_position: i64,
        new_parent: ParentTarget,
    ) -> Result<(), TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let node = self.lock_resource(session, node_id).await?;
        let old_parent_id = node.parent_id;
        let new_parent_id = new_parent.resolve(old_parent_id);
        let same_branch = new_parent_id == old_parent_id;

        if !same_branch {
            self.check_node_parent(session, node_id, new_parent_id)
                .await?;
        }
        self.check_node_position(session, new_parent_id, to_position, same_branch)
            .await?;

        if same_branch {
            let Some(shift) = OrderingMaintainer::reorder_shift(node.ordering, to_position) else {
                tracing::debug!("Resource {} already at position {}", node_id, to_position);
                return Ok(());
            };
            session.shift(old_parent_id, shift.range, shift.delta).await?;
            session
                .update_position(node_id, old_parent_id, to_position)
                .await?;
        } else {
            OrderingMaintainer::shift_up(session, new_parent_id, to_position).await?;
            session
                .update_position(node_id, new_parent_id, to_position)
                .await?;
            OrderingMaintainer::shift_down(session, old_parent_id, node.ordering).await?;
        }

        tracing::debug!(
            "Moved resource {} from {:?}#{} to {:?}#{}",
            node_id,
            old_parent_id,
            node.ordering,
            new_parent_id,
            to_position
        );
        Ok(())
    }

    /// Place a resource that was just added to its sibling group at `to_position`
    ///
    /// The ceiling is the number of *other* siblings plus one. Siblings between the
    /// resource's current slot and `to_position` shift to keep the group dense; for a
    /// resource appended last this is exactly "every sibling at `to_position` or later
    /// moves up by one".
    pub async fn set_position<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        to_position: i64,
    ) -> Result<(), TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let node = self.lock_resource(session, node_id).await?;
        let other_siblings = session.children_count(node.parent_id).await? - 1;
        OrderingMaintainer::validate_position(to_position, other_siblings, false)?;

        if let Some(shift) = OrderingMaintainer::reorder_shift(node.ordering, to_position) {
            session.shift(node.parent_id, shift.range, shift.delta).await?;
            session
                .update_position(node_id, node.parent_id, to_position)
                .await?;
        }

        tracing::debug!(
            "Positioned resource {} at {:?}#{}",
            node_id,
            node.parent_id,
            to_position
        );
        Ok(())
    }

    /// Delete `node_id` together with all its descendants
    ///
    /// Returns the number of deleted resources. Siblings after the removed resource
    /// move down to close the gap.
    pub async fn delete_branch<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
    ) -> Result<u64, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let node = self.lock_resource(session, node_id).await?;
        let branch = TreeNavigator::branch_ids(session, node_id).await?;

        let deleted = session.delete_ids(&branch).await?;
        OrderingMaintainer::shift_down(session, node.parent_id, node.ordering).await?;

        tracing::debug!(
            "Deleted branch of resource {} ({} resources) from {:?}#{}",
            node_id,
            deleted,
            node.parent_id,
            node.ordering
        );
        Ok(deleted)
    }

    //
    // NAVIGATION
    //

    /// See [`TreeNavigator::subtree_from`]
    pub async fn subtree_from<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        TreeNavigator::subtree_from(session, node_id, self.depth_or_default(max_depth)).await
    }

    /// See [`TreeNavigator::subtree_from_parent`]
    pub async fn subtree_from_parent<S>(
        &self,
        session: &mut S,
        parent_id: Option<ResourceId>,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        TreeNavigator::subtree_from_parent(session, parent_id, self.depth_or_default(max_depth))
            .await
    }

    /// See [`TreeNavigator::ancestors_of`]
    pub async fn ancestors_of<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Resource>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        TreeNavigator::ancestors_of(session, node_id, self.depth_or_default(max_depth)).await
    }

    /// Nested subtree rooted at `node_id`
    pub async fn subtree_struct_from<S>(
        &self,
        session: &mut S,
        node_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<SubtreeNode, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let rows = self.subtree_from(session, node_id, max_depth).await?;
        build_subtree_struct(rows)
    }

    /// Nested subtree of the children of `parent_id` (the whole forest for `None`)
    pub async fn subtree_struct_from_parent<S>(
        &self,
        session: &mut S,
        parent_id: Option<ResourceId>,
        max_depth: Option<u32>,
    ) -> Result<SubtreeNode, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let rows = self.subtree_from_parent(session, parent_id, max_depth).await?;
        build_subtree_struct(rows)
    }

    //
    // INTEGRITY
    //

    /// Sibling groups reachable from the root level whose orderings are not dense
    pub async fn verify_ordering<S>(
        &self,
        session: &mut S,
    ) -> Result<Vec<OrderingViolation>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let rows = TreeNavigator::subtree_from_parent(session, None, None).await?;

        let mut groups: BTreeMap<Option<ResourceId>, Vec<i64>> = BTreeMap::new();
        for row in &rows {
            groups
                .entry(row.resource.parent_id)
                .or_default()
                .push(row.resource.ordering);
        }

        let violations = OrderingMaintainer::find_violations(groups);
        if !violations.is_empty() {
            tracing::warn!("Found {} sibling groups with broken ordering", violations.len());
        }
        Ok(violations)
    }
}
