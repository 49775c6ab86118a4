//! Read-only tree navigation
//!
//! Thin layer over the recursive queries of a [`NodeSession`]: subtree below a
//! resource, subtree below a parent (or the whole forest), and the ancestor path
//! above a resource. Navigation takes no locks.

use crate::db::NodeSession;
use crate::models::{Resource, ResourceId, TreeRow};
use crate::services::error::TreeServiceError;

/// Depth-bounded traversals of the resource tree
pub struct TreeNavigator;

impl TreeNavigator {
    /// `node_id` and everything below it, down to `max_depth` levels
    ///
    /// Rows come back in depth-first sibling order. Empty when `node_id` does not exist.
    pub async fn subtree_from<S>(
        session: &mut S,
        node_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        Ok(session.query_descendants(node_id, max_depth).await?)
    }

    /// Children of `parent_id` (root resources for `None`) and everything below them
    pub async fn subtree_from_parent<S>(
        session: &mut S,
        parent_id: Option<ResourceId>,
        max_depth: Option<u32>,
    ) -> Result<Vec<TreeRow>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        Ok(session.query_children_level(parent_id, max_depth).await?)
    }

    /// `node_id` followed by its ancestors, nearest first, at most `max_depth` entries
    pub async fn ancestors_of<S>(
        session: &mut S,
        node_id: ResourceId,
        max_depth: Option<u32>,
    ) -> Result<Vec<Resource>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        Ok(session.query_ancestors(node_id, max_depth).await?)
    }

    /// Ids of `node_id` and all its transitive descendants
    pub async fn branch_ids<S>(
        session: &mut S,
        node_id: ResourceId,
    ) -> Result<Vec<ResourceId>, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let rows = Self::subtree_from(session, node_id, None).await?;
        Ok(rows.into_iter().map(|row| row.resource.id).collect())
    }

    /// True when `candidate` is `node_id` itself or lies below it
    pub async fn is_within_branch<S>(
        session: &mut S,
        node_id: ResourceId,
        candidate: ResourceId,
    ) -> Result<bool, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        if candidate == node_id {
            return Ok(true);
        }
        let path = Self::ancestors_of(session, candidate, None).await?;
        Ok(path.iter().any(|resource| resource.id == node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NodeStore};
    use crate::models::{NewResource, ResourceKind};

    /// root(1) -> a(2) -> a1(4), root(1) -> b(3)
    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        let rows = [(1, None, 1), (2, Some(1), 1), (3, Some(1), 2), (4, Some(2), 1)];
        for (id, parent_id, ordering) in rows {
            let mut new = NewResource::new(format!("r{id}"), ResourceKind::Folder).with_id(id);
            new.parent_id = parent_id;
            session.insert(new, ordering).await.unwrap();
        }
        session.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_subtree_from_is_depth_first() {
        let store = seeded_store().await;
        let mut session = store.begin().await.unwrap();

        let rows = TreeNavigator::subtree_from(&mut session, 1, None)
            .await
            .unwrap();
        let ids: Vec<ResourceId> = rows.iter().map(|r| r.resource.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(rows[0].depth, 1);
        assert_eq!(rows[2].path, vec![1, 2, 4]);
        assert_eq!(rows[3].sort_key, "0000001/0000002");
    }

    #[tokio::test]
    async fn test_subtree_from_missing_node_is_empty() {
        let store = seeded_store().await;
        let mut session = store.begin().await.unwrap();

        let rows = TreeNavigator::subtree_from(&mut session, 99, None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_depth_limits() {
        let store = seeded_store().await;
        let mut session = store.begin().await.unwrap();

        let shallow = TreeNavigator::subtree_from(&mut session, 1, Some(2))
            .await
            .unwrap();
        assert_eq!(shallow.len(), 3);

        let from_parent = TreeNavigator::subtree_from_parent(&mut session, Some(1), Some(1))
            .await
            .unwrap();
        let ids: Vec<ResourceId> = from_parent.iter().map(|r| r.resource.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(from_parent.iter().all(|r| r.depth == 1));

        let nothing = TreeNavigator::subtree_from(&mut session, 1, Some(0))
            .await
            .unwrap();
        assert!(nothing.is_empty());
    }

    #[tokio::test]
    async fn test_ancestors_of() {
        let store = seeded_store().await;
        let mut session = store.begin().await.unwrap();

        let path = TreeNavigator::ancestors_of(&mut session, 4, None)
            .await
            .unwrap();
        let ids: Vec<ResourceId> = path.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 1]);

        let limited = TreeNavigator::ancestors_of(&mut session, 4, Some(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_branch_membership() {
        let store = seeded_store().await;
        let mut session = store.begin().await.unwrap();

        assert!(TreeNavigator::is_within_branch(&mut session, 2, 4).await.unwrap());
        assert!(TreeNavigator::is_within_branch(&mut session, 2, 2).await.unwrap());
        assert!(!TreeNavigator::is_within_branch(&mut session, 2, 3).await.unwrap());

        let mut ids = TreeNavigator::branch_ids(&mut session, 2).await.unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 4]);
    }
}
