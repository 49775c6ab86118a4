//! Nested subtree assembly
//!
//! Turns the flat, sort-key-ordered rows of a navigation query into a
//! [`SubtreeNode`] hierarchy in a single pass.

use crate::models::{SubtreeNode, TreeRow};
use crate::services::error::TreeServiceError;

/// Build a nested subtree from depth-first ordered rows
///
/// Each row is inserted below the container reached by walking its `path`
/// (ancestors only) from a virtual root. Ancestors must already have been inserted,
/// which holds for any stream sorted by sort key; otherwise a
/// [`TreeServiceError::Consistency`] error is returned.
///
/// # Examples
/// ```
/// # use ziggurat_core::services::build_subtree_struct;
/// let tree = build_subtree_struct(Vec::new()).unwrap();
/// assert!(tree.node.is_none());
/// assert!(tree.children.is_empty());
/// ```
pub fn build_subtree_struct<I>(rows: I) -> Result<SubtreeNode, TreeServiceError>
where
    I: IntoIterator<Item = TreeRow>,
{
    let mut root = SubtreeNode::default();

    for row in rows {
        let node_id = row.resource.id;
        let mut container = &mut root;

        for ancestor_id in row.ancestor_ids() {
            container = container.children.get_mut(ancestor_id).ok_or_else(|| {
                TreeServiceError::consistency(format!(
                    "resource {} arrived before its ancestor {} (path {:?})",
                    node_id, ancestor_id, row.path
                ))
            })?;
        }

        container
            .children
            .insert(node_id, SubtreeNode::new(row.resource));
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewResource, Resource, ResourceId, ResourceKind};

    fn resource(id: ResourceId, parent_id: Option<ResourceId>, ordering: i64) -> Resource {
        let mut new = NewResource::new(format!("r{id}"), ResourceKind::Folder);
        new.parent_id = parent_id;
        new.into_resource(id, ordering)
    }

    #[test]
    fn test_builds_nested_structure_in_sibling_order() {
        let root = TreeRow::start(resource(1, None, 1));
        let b = root.child(resource(3, Some(1), 1));
        let a = root.child(resource(2, Some(1), 2));
        let b1 = b.child(resource(5, Some(3), 1));

        let tree = build_subtree_struct(vec![root, b, b1, a]).unwrap();

        assert!(tree.node.is_none());
        assert_eq!(tree.child_ids(), vec![1]);
        let top = &tree.children[&1];
        assert_eq!(top.child_ids(), vec![3, 2]);
        assert_eq!(top.children[&3].child_ids(), vec![5]);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_multiple_start_rows_become_top_level_children() {
        let rows = vec![
            TreeRow::start(resource(7, None, 1)),
            TreeRow::start(resource(8, None, 2)),
        ];
        let tree = build_subtree_struct(rows).unwrap();
        assert_eq!(tree.child_ids(), vec![7, 8]);
    }

    #[test]
    fn test_missing_ancestor_is_consistency_error() {
        let root = TreeRow::start(resource(1, None, 1));
        let child = root.child(resource(2, Some(1), 1));

        let err = build_subtree_struct(vec![child]).unwrap_err();
        assert!(matches!(err, TreeServiceError::Consistency(_)));
    }
}
