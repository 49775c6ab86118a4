//! Tree traversal rows and nested subtree structures
//!
//! Navigation queries return flat [`TreeRow`]s annotated with depth, sort key and
//! id path. Sorting rows by `sort_key` yields a depth-first, sibling-ordered walk,
//! which is what [`SubtreeNode`] assembly relies on.

use crate::models::{Resource, ResourceId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Width of one zero-padded ordering segment in a sort key
///
/// Orderings above 9,999,999 would widen the segment and break lexicographic
/// sibling order; position validation caps groups below that.
pub const SORT_KEY_WIDTH: usize = 7;

/// Separator between sort key segments and between path ids.
///
/// `/` sorts below every digit, so a parent's key always precedes its children's.
pub const TREE_PATH_SEPARATOR: char = '/';

/// Format one ordering value as a fixed-width sort key segment
///
/// # Examples
/// ```
/// # use ziggurat_core::models::sort_key_segment;
/// assert_eq!(sort_key_segment(12), "0000012");
/// ```
pub fn sort_key_segment(ordering: i64) -> String {
    format!("{:0width$}", ordering, width = SORT_KEY_WIDTH)
}

/// Parse a `/`-joined id path as produced by the SQL backend
pub fn parse_tree_path(path: &str) -> Result<Vec<ResourceId>, std::num::ParseIntError> {
    path.split(TREE_PATH_SEPARATOR)
        .map(|segment| segment.parse::<ResourceId>())
        .collect()
}

/// One resource of a traversal, annotated for subtree reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRow {
    pub resource: Resource,
    /// 1 for the traversal start set, +1 per level below it
    pub depth: u32,
    /// Concatenated zero-padded orderings from the traversal start down to this resource
    pub sort_key: String,
    /// Resource ids from the traversal start down to (and including) this resource
    pub path: Vec<ResourceId>,
}

impl TreeRow {
    /// Row for a member of the traversal start set
    pub fn start(resource: Resource) -> Self {
        let sort_key = sort_key_segment(resource.ordering);
        let path = vec![resource.id];
        Self {
            resource,
            depth: 1,
            sort_key,
            path,
        }
    }

    /// Row for a direct child of `self`
    pub fn child(&self, resource: Resource) -> Self {
        let mut sort_key = String::with_capacity(self.sort_key.len() + 1 + SORT_KEY_WIDTH);
        sort_key.push_str(&self.sort_key);
        sort_key.push(TREE_PATH_SEPARATOR);
        sort_key.push_str(&sort_key_segment(resource.ordering));

        let mut path = self.path.clone();
        path.push(resource.id);

        Self {
            resource,
            depth: self.depth + 1,
            sort_key,
            path,
        }
    }

    /// Ids of the ancestors inside this traversal, excluding the resource itself
    pub fn ancestor_ids(&self) -> &[ResourceId] {
        match self.path.split_last() {
            Some((_, ancestors)) => ancestors,
            None => &[],
        }
    }
}

/// Nested subtree: a resource plus its children keyed by id in sibling order.
///
/// The top-level value is a virtual root whose `node` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtreeNode {
    pub node: Option<Resource>,
    pub children: IndexMap<ResourceId, SubtreeNode>,
}

impl SubtreeNode {
    pub fn new(node: Resource) -> Self {
        Self {
            node: Some(node),
            children: IndexMap::new(),
        }
    }

    /// Child ids in sibling order
    pub fn child_ids(&self) -> Vec<ResourceId> {
        self.children.keys().copied().collect()
    }

    /// Number of resources in this subtree, excluding a virtual root
    pub fn len(&self) -> usize {
        let own = usize::from(self.node.is_some());
        own + self.children.values().map(SubtreeNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewResource, ResourceKind};

    fn resource(id: ResourceId, parent_id: Option<ResourceId>, ordering: i64) -> Resource {
        let mut new = NewResource::new(format!("r{id}"), ResourceKind::Folder);
        new.parent_id = parent_id;
        new.into_resource(id, ordering)
    }

    #[test]
    fn test_sort_key_segment_is_fixed_width() {
        assert_eq!(sort_key_segment(1), "0000001");
        assert_eq!(sort_key_segment(1234567), "1234567");
    }

    #[test]
    fn test_child_row_extends_key_and_path() {
        let root = TreeRow::start(resource(1, None, 2));
        let child = root.child(resource(5, Some(1), 10));

        assert_eq!(child.depth, 2);
        assert_eq!(child.sort_key, "0000002/0000010");
        assert_eq!(child.path, vec![1, 5]);
        assert_eq!(child.ancestor_ids(), &[1]);
        assert!(root.ancestor_ids().is_empty());
    }

    #[test]
    fn test_sort_key_orders_depth_first() {
        let a = TreeRow::start(resource(1, None, 1));
        let a_child = a.child(resource(4, Some(1), 10));
        let b = TreeRow::start(resource(2, None, 2));

        let mut keys = vec![b.sort_key.clone(), a_child.sort_key.clone(), a.sort_key.clone()];
        keys.sort();
        assert_eq!(keys, vec![a.sort_key, a_child.sort_key, b.sort_key]);
    }

    #[test]
    fn test_parse_tree_path() {
        assert_eq!(parse_tree_path("1/5/6").unwrap(), vec![1, 5, 6]);
        assert_eq!(parse_tree_path("42").unwrap(), vec![42]);
        assert!(parse_tree_path("1/x").is_err());
    }
}
