//! NodeStore Trait - Storage Abstraction for the Resource Tree
//!
//! This module defines the `NodeStore` and `NodeSession` traits that abstract the
//! persistence of tree resources. Tree services never talk to a database directly;
//! they receive an explicit session and drive it through the methods below.
//!
//! # Architecture
//!
//! - **Explicit sessions**: `NodeStore::begin()` opens a transaction boundary and returns
//!   a `NodeSession`. Every tree operation takes `&mut` to a session supplied by the
//!   caller, and the caller decides whether to `commit()` or `rollback()`.
//! - **Lock for update**: `get_for_update()` is invoked at the start of every structural
//!   mutation. Backends map it to their strongest available lock (row lock, reserved
//!   database lock, or an exclusive in-process mutex).
//! - **Engine-agnostic traversal**: the recursive queries have default implementations
//!   built on `get()` and `children_of()`, so every backend supports subtree and ancestor
//!   queries. Backends with recursive SQL may override them but must produce identical
//!   sort keys and paths (see [`crate::models::TreeRow`]).
//!
//! # Examples
//!
//! ```rust,no_run
//! use ziggurat_core::db::{MemoryStore, NodeSession, NodeStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!
//!     let mut session = store.begin().await?;
//!     let roots = session.children_of(None).await?;
//!     println!("{} root resources", roots.len());
//!     session.commit().await?;
//!
//!     Ok(())
//! }
//! ```

use crate::models::{NewResource, Resource, ResourceId, TreeRow};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;

/// Inclusive window of sibling positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    /// Lowest affected position
    pub from: i64,
    /// Highest affected position, `None` for "through the last sibling"
    pub to: Option<i64>,
}

impl PositionRange {
    /// Every position `>= from`
    pub fn starting_at(from: i64) -> Self {
        Self { from, to: None }
    }

    /// Positions in `from..=to`
    pub fn between(from: i64, to: i64) -> Self {
        Self { from, to: Some(to) }
    }

    pub fn contains(&self, ordering: i64) -> bool {
        ordering >= self.from && self.to.map_or(true, |to| ordering <= to)
    }
}

/// Entry point of a storage backend: hands out transactional sessions
#[async_trait]
pub trait NodeStore: Send + Sync {
    type Session: NodeSession;

    /// Open a new session (transaction)
    ///
    /// The session holds whatever locks the backend needs until it is committed,
    /// rolled back or dropped. Dropping an uncommitted session discards its changes.
    async fn begin(&self) -> Result<Self::Session>;
}

/// Transactional handle for reading and mutating tree resources
///
/// All methods operate inside the session's transaction. Positions are 1-based
/// sibling slots; `parent_id = None` addresses the root sibling group.
#[async_trait]
pub trait NodeSession: Send {
    //
    // READS
    //

    /// Fetch a resource without taking a lock
    async fn get(&mut self, id: ResourceId) -> Result<Option<Resource>>;

    /// Fetch a resource and lock it for the remainder of the session
    ///
    /// Must be called before a resource's `parent_id` / `ordering` are used as the
    /// basis of a structural mutation.
    async fn get_for_update(&mut self, id: ResourceId) -> Result<Option<Resource>>;

    /// Number of direct children of `parent_id`
    async fn children_count(&mut self, parent_id: Option<ResourceId>) -> Result<i64>;

    /// Direct children of `parent_id`, ascending by `ordering`
    async fn children_of(&mut self, parent_id: Option<ResourceId>) -> Result<Vec<Resource>>;

    //
    // WRITES
    //

    /// Insert a resource at the position given by `ordering`
    ///
    /// The store assigns an id when `resource.id` is `None`. The caller is
    /// responsible for having opened the sibling slot beforehand.
    async fn insert(&mut self, resource: NewResource, ordering: i64) -> Result<Resource>;

    /// Add `delta` to the ordering of every child of `parent_id` inside `range`
    ///
    /// Returns the number of shifted siblings.
    async fn shift(
        &mut self,
        parent_id: Option<ResourceId>,
        range: PositionRange,
        delta: i64,
    ) -> Result<u64>;

    /// Persist a new parent and ordering for one resource
    async fn update_position(
        &mut self,
        id: ResourceId,
        parent_id: Option<ResourceId>,
        ordering: i64,
    ) -> Result<()>;

    /// Delete all listed resources in one operation, returning the number removed
    async fn delete_ids(&mut self, ids: &[ResourceId]) -> Result<u64>;

    //
    // RECURSIVE QUERIES
    //

    /// `start_id` and its descendants down to `max_depth` levels, sorted by sort key
    ///
    /// Returns an empty list when `start_id` does not exist.
    async fn query_descendants(
        &mut self,
        start_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>> {
        let start = match self.get(start_id).await? {
            Some(resource) => vec![TreeRow::start(resource)],
            None => Vec::new(),
        };
        expand_breadth_first(self, start, max_depth).await
    }

    /// Children of `parent_id` (root resources for `None`) and their descendants,
    /// sorted by sort key
    async fn query_children_level(
        &mut self,
        parent_id: Option<ResourceId>,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>> {
        let start = self
            .children_of(parent_id)
            .await?
            .into_iter()
            .map(TreeRow::start)
            .collect();
        expand_breadth_first(self, start, max_depth).await
    }

    /// `start_id` followed by its ancestors, nearest first, at most `max_depth` entries
    ///
    /// Fails when the parent chain loops back on itself within the walked entries.
    async fn query_ancestors(
        &mut self,
        start_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Resource>> {
        let mut chain: Vec<Resource> = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(start_id);

        while let Some(id) = next {
            if max_depth.is_some_and(|max| chain.len() as u64 >= u64::from(max)) {
                break;
            }
            let Some(resource) = self.get(id).await? else {
                break;
            };
            if !seen.insert(resource.id) {
                bail!("Parent chain of resource {} loops through {}", start_id, resource.id);
            }
            next = resource.parent_id;
            chain.push(resource);
        }

        Ok(chain)
    }

    //
    // LIFECYCLE
    //

    /// Make every change of this session durable and release its locks
    async fn commit(self) -> Result<()>;

    /// Discard every change of this session and release its locks
    async fn rollback(self) -> Result<()>;
}

/// Level-by-level expansion of a traversal start set
///
/// Rows are returned sorted by sort key, i.e. depth-first in sibling order.
async fn expand_breadth_first<S>(
    session: &mut S,
    start: Vec<TreeRow>,
    max_depth: Option<u32>,
) -> Result<Vec<TreeRow>>
where
    S: NodeSession + ?Sized,
{
    if max_depth == Some(0) {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    let mut visited = HashSet::new();
    let mut frontier = start;

    while !frontier.is_empty() {
        let mut next_level = Vec::new();
        for row in frontier {
            if !visited.insert(row.resource.id) {
                bail!("Resource {} reached twice while walking the tree", row.resource.id);
            }
            if max_depth.map_or(true, |max| row.depth < max) {
                for child in session.children_of(Some(row.resource.id)).await? {
                    next_level.push(row.child(child));
                }
            }
            rows.push(row);
        }
        frontier = next_level;
    }

    rows.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    Ok(rows)
}
