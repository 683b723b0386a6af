//! Error types for the CloudOps system.

use thiserror::Error;

/// A structural rule of the resource tree or its bindings that an
/// operation would break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node level {level} exceeds the limit of {max} under its parent")]
    LevelExceeded { level: i64, max: i64 },

    #[error("node level {level} exceeds the configured maximum depth {max}")]
    DepthLimitExceeded { level: i64, max: i64 },

    #[error("parent node {parent_id} is a leaf and cannot have children")]
    ParentIsLeaf { parent_id: i64 },

    #[error("node {node_id} still has children")]
    HasChildren { node_id: i64 },

    #[error("node {node_id} still has {bindings} bound resource(s)")]
    NodeBound { node_id: i64, bindings: u64 },

    #[error("resource {resource_id} is bound to {nodes} node(s)")]
    ResourceBound { resource_id: i64, nodes: usize },
}

/// Coarse classification of a [`CloudOpsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvariantViolation,
    Validation,
    Internal,
}

#[derive(Debug, Error)]
pub enum CloudOpsError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl CloudOpsError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Invariant(_) => ErrorKind::InvariantViolation,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// The violated invariant, if this error is one.
    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            Self::Invariant(v) => Some(v),
            _ => None,
        }
    }
}

pub type CloudOpsResult<T> = Result<T, CloudOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_classify_as_invariant() {
        let err: CloudOpsError = InvariantViolation::HasChildren { node_id: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::HasChildren { node_id: 3 })
        );
    }

    #[test]
    fn store_failures_classify_as_internal() {
        let err = CloudOpsError::Database("connection reset".into());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.violation().is_none());
    }

    #[test]
    fn not_found_carries_entity_and_id() {
        let err = CloudOpsError::not_found("tree_node", 42);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Entity not found: tree_node with id 42");
    }
}
