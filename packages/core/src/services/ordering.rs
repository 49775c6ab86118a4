//! Sibling ordering maintenance
//!
//! Keeps the `ordering` values of every sibling group a dense `1..=N` sequence.
//! Position math is pure and lives in associated functions; the shifting helpers
//! apply it through a caller-supplied session so they run inside the same
//! transaction as the mutation they support.

use crate::db::{NodeSession, PositionRange};
use crate::models::ResourceId;
use crate::services::error::TreeServiceError;
use std::collections::BTreeMap;

/// Lowest valid sibling position
pub const MIN_POSITION: i64 = 1;

/// Highest position that still fits one fixed-width sort key segment
pub const MAX_POSITION: i64 = 9_999_999;

/// Sibling shift needed to move a resource within its own sibling group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderShift {
    pub range: PositionRange,
    pub delta: i64,
}

/// A sibling group whose orderings are not `1..=N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingViolation {
    pub parent_id: Option<ResourceId>,
    /// Orderings found in the group, ascending
    pub found: Vec<i64>,
}

/// Position arithmetic and shift primitives for sibling groups
pub struct OrderingMaintainer;

impl OrderingMaintainer {
    /// Inclusive `(min, max)` valid positions for a sibling group of `sibling_count`
    ///
    /// A resource already in the group can take any existing slot; one arriving from
    /// elsewhere may also extend the group by one. No group grows past [`MAX_POSITION`].
    pub fn position_bounds(sibling_count: i64, on_same_branch: bool) -> (i64, i64) {
        let max = if on_same_branch {
            sibling_count
        } else {
            sibling_count + 1
        };
        (MIN_POSITION, max.min(MAX_POSITION))
    }

    /// Reject positions outside [`Self::position_bounds`]
    pub fn validate_position(
        position: i64,
        sibling_count: i64,
        on_same_branch: bool,
    ) -> Result<(), TreeServiceError> {
        let (min, max) = Self::position_bounds(sibling_count, on_same_branch);
        if position < min || position > max {
            return Err(TreeServiceError::out_of_boundary(position, min, max));
        }
        Ok(())
    }

    /// Shift that moves a resource from `current` to `target` within one group
    ///
    /// Siblings between the two slots move one step towards `current`; the resource's
    /// own slot is never part of the range. Returns `None` when nothing moves.
    ///
    /// # Examples
    /// ```
    /// # use ziggurat_core::services::OrderingMaintainer;
    /// // Moving from slot 3 to slot 1 pushes slots 1..=2 down by one
    /// let shift = OrderingMaintainer::reorder_shift(3, 1).unwrap();
    /// assert_eq!(shift.delta, 1);
    /// assert_eq!((shift.range.from, shift.range.to), (1, Some(2)));
    /// ```
    pub fn reorder_shift(current: i64, target: i64) -> Option<ReorderShift> {
        if target < current {
            Some(ReorderShift {
                range: PositionRange::between(target, current - 1),
                delta: 1,
            })
        } else if target > current {
            Some(ReorderShift {
                range: PositionRange::between(current + 1, target),
                delta: -1,
            })
        } else {
            None
        }
    }

    /// True when `orderings` (any order) are exactly `1..=len`
    pub fn is_dense(orderings: &[i64]) -> bool {
        let mut sorted = orderings.to_vec();
        sorted.sort_unstable();
        sorted
            .iter()
            .zip(MIN_POSITION..)
            .all(|(ordering, expected)| *ordering == expected)
    }

    /// Every sibling group in `groups` that is not dense
    pub fn find_violations(
        groups: BTreeMap<Option<ResourceId>, Vec<i64>>,
    ) -> Vec<OrderingViolation> {
        groups
            .into_iter()
            .filter(|(_, orderings)| !Self::is_dense(orderings))
            .map(|(parent_id, mut found)| {
                found.sort_unstable();
                OrderingViolation { parent_id, found }
            })
            .collect()
    }

    /// Open a gap: every sibling at `from_position` or later moves up by one
    pub async fn shift_up<S>(
        session: &mut S,
        parent_id: Option<ResourceId>,
        from_position: i64,
    ) -> Result<u64, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let shifted = session
            .shift(parent_id, PositionRange::starting_at(from_position), 1)
            .await?;
        tracing::trace!(
            "Shifted {} siblings of {:?} up from position {}",
            shifted,
            parent_id,
            from_position
        );
        Ok(shifted)
    }

    /// Close a gap: every sibling at `from_position` or later moves down by one
    pub async fn shift_down<S>(
        session: &mut S,
        parent_id: Option<ResourceId>,
        from_position: i64,
    ) -> Result<u64, TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let shifted = session
            .shift(parent_id, PositionRange::starting_at(from_position), -1)
            .await?;
        tracing::trace!(
            "Shifted {} siblings of {:?} down from position {}",
            shifted,
            parent_id,
            from_position
        );
        Ok(shifted)
    }

    /// Count the siblings of `parent_id` and validate `position` against them
    pub async fn check_position<S>(
        session: &mut S,
        parent_id: Option<ResourceId>,
        position: i64,
        on_same_branch: bool,
    ) -> Result<(), TreeServiceError>
    where
        S: NodeSession + ?Sized,
    {
        let count = session.children_count(parent_id).await?;
        Self::validate_position(position, count, on_same_branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NodeStore};
    use crate::models::{NewResource, ResourceKind};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_bounds_same_branch_and_incoming() {
        assert_eq!(OrderingMaintainer::position_bounds(3, true), (1, 3));
        assert_eq!(OrderingMaintainer::position_bounds(3, false), (1, 4));
        assert_eq!(OrderingMaintainer::position_bounds(0, false), (1, 1));
    }

    #[test]
    fn test_validate_position_rejects_out_of_range() {
        assert_ok!(OrderingMaintainer::validate_position(1, 3, true));
        assert_ok!(OrderingMaintainer::validate_position(3, 3, true));
        assert_ok!(OrderingMaintainer::validate_position(4, 3, false));

        for (position, on_same_branch) in [(0, true), (-2, false), (4, true), (5, false)] {
            let err = OrderingMaintainer::validate_position(position, 3, on_same_branch)
                .unwrap_err();
            assert!(matches!(
                err,
                TreeServiceError::OutOfBoundary { position: p, min: 1, .. } if p == position
            ));
        }
    }

    #[test]
    fn test_positions_stop_at_sort_key_width() {
        assert_eq!(
            OrderingMaintainer::position_bounds(MAX_POSITION, false),
            (1, MAX_POSITION)
        );
        assert_ok!(OrderingMaintainer::validate_position(MAX_POSITION, MAX_POSITION, true));

        let err = OrderingMaintainer::validate_position(MAX_POSITION + 1, MAX_POSITION, false)
            .unwrap_err();
        assert!(matches!(
            err,
            TreeServiceError::OutOfBoundary { max: MAX_POSITION, .. }
        ));
        assert_eq!(
            crate::models::sort_key_segment(MAX_POSITION).len(),
            crate::models::SORT_KEY_WIDTH
        );
    }

    #[test]
    fn test_reorder_shift_directions() {
        assert_eq!(OrderingMaintainer::reorder_shift(2, 2), None);

        let up = OrderingMaintainer::reorder_shift(4, 2).unwrap();
        assert_eq!(up.range, PositionRange::between(2, 3));
        assert_eq!(up.delta, 1);

        let down = OrderingMaintainer::reorder_shift(1, 3).unwrap();
        assert_eq!(down.range, PositionRange::between(2, 3));
        assert_eq!(down.delta, -1);
    }

    #[test]
    fn test_is_dense() {
        assert!(OrderingMaintainer::is_dense(&[]));
        assert!(OrderingMaintainer::is_dense(&[2, 1, 3]));
        assert!(!OrderingMaintainer::is_dense(&[1, 3]));
        assert!(!OrderingMaintainer::is_dense(&[1, 2, 2]));
        assert!(!OrderingMaintainer::is_dense(&[0, 1]));
    }

    #[test]
    fn test_find_violations_reports_sorted_orderings() {
        let mut groups = BTreeMap::new();
        groups.insert(None, vec![1, 2]);
        groups.insert(Some(4), vec![3, 1]);

        let violations = OrderingMaintainer::find_violations(groups);
        assert_eq!(
            violations,
            vec![OrderingViolation {
                parent_id: Some(4),
                found: vec![1, 3],
            }]
        );
    }

    #[tokio::test]
    async fn test_shift_up_then_down_restores_group() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        for ordering in 1..=3 {
            session
                .insert(NewResource::new("r", ResourceKind::Folder), ordering)
                .await
                .unwrap();
        }

        let moved = OrderingMaintainer::shift_up(&mut session, None, 2)
            .await
            .unwrap();
        assert_eq!(moved, 2);
        let orderings: Vec<i64> = session
            .children_of(None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.ordering)
            .collect();
        assert_eq!(orderings, vec![1, 3, 4]);

        OrderingMaintainer::shift_down(&mut session, None, 3)
            .await
            .unwrap();
        let orderings: Vec<i64> = session
            .children_of(None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.ordering)
            .collect();
        assert_eq!(orderings, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_check_position_counts_siblings() {
        let store = MemoryStore::new();
        let mut session = store.begin().await.unwrap();
        session
            .insert(NewResource::new("only", ResourceKind::Folder), 1)
            .await
            .unwrap();

        assert_ok!(OrderingMaintainer::check_position(&mut session, None, 2, false).await);
        assert_err!(OrderingMaintainer::check_position(&mut session, None, 2, true).await);
    }
}
