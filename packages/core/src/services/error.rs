//! Service Layer Error Types
//!
//! This module defines the error type for resource tree operations. Every structural
//! rule violation has its own variant so callers can translate each one distinctly;
//! storage failures are carried through unchanged.

use crate::models::ResourceId;
use thiserror::Error;

/// Resource tree operation errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// A referenced resource (the moved resource or its new parent) does not exist
    #[error("Resource not found: {id}")]
    NodeNotFound { id: ResourceId },

    /// The move would place a resource under itself or one of its descendants
    #[error("Cannot move resource {node_id} under {parent_id}: target lies inside the resource's own branch")]
    CycleDetected {
        node_id: ResourceId,
        parent_id: ResourceId,
    },

    /// Requested position lies outside the destination sibling group
    #[error("Position {position} is out of bounds, expected {min}..={max}")]
    OutOfBoundary { position: i64, min: i64, max: i64 },

    /// Traversal rows contradict each other (corrupted sort order or store contract violation)
    #[error("Tree consistency violated: {0}")]
    Consistency(String),

    /// Storage backend failure
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl TreeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: ResourceId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a cycle error
    pub fn cycle_detected(node_id: ResourceId, parent_id: ResourceId) -> Self {
        Self::CycleDetected { node_id, parent_id }
    }

    /// Create an out of boundary error
    pub fn out_of_boundary(position: i64, min: i64, max: i64) -> Self {
        Self::OutOfBoundary { position, min, max }
    }

    /// Create a consistency error
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// True for rule violations raised before any mutation was attempted
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::CycleDetected { .. } | Self::OutOfBoundary { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TreeServiceError::out_of_boundary(0, 1, 3).to_string(),
            "Position 0 is out of bounds, expected 1..=3"
        );
        assert_eq!(
            TreeServiceError::node_not_found(6).to_string(),
            "Resource not found: 6"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(TreeServiceError::cycle_detected(1, 6).is_validation_error());
        assert!(!TreeServiceError::consistency("bad path").is_validation_error());
        assert!(!TreeServiceError::from(anyhow::anyhow!("io")).is_validation_error());
    }
}
