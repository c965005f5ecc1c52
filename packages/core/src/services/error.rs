//! Service Layer Error Types
//!
//! This module defines the errors surfaced by `KnowledgeTreeService`. Each
//! variant belongs to one `ErrorKind`, which is what a request layer maps to
//! its status codes.

use crate::db::{DatabaseError, OrderingError};
use crate::models::ValidationError;
use thiserror::Error;

/// Coarse classification of service failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    CycleRejected,
    Unauthenticated,
    PermissionDenied,
    /// Transient lock contention; the whole operation may be retried
    Conflict,
    StorageUnavailable,
}

/// Tree service operation errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Node not found in the given knowledge base
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Malformed request or violated kind constraint
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A node cannot be positioned relative to itself
    #[error("Cannot move node {id} relative to itself")]
    SelfMove { id: String },

    /// The target lies inside the subtree of the moved node
    #[error("Cannot move node {node_id} into its own subtree (target {target_id})")]
    CycleRejected { node_id: String, target_id: String },

    /// No user identity was attached to the service
    #[error("Authentication required")]
    Unauthenticated,

    /// The permission oracle refused the operation
    #[error("User {user_id} lacks {level} access to knowledge base {kb_id}")]
    PermissionDenied {
        kb_id: String,
        user_id: String,
        level: String,
    },

    /// Write lock contention
    #[error("Conflicting concurrent modification: {context}")]
    Conflict { context: String },

    /// Underlying persistence failure
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(DatabaseError),
}

impl TreeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn self_move(id: impl Into<String>) -> Self {
        Self::SelfMove { id: id.into() }
    }

    pub fn cycle_rejected(node_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::CycleRejected {
            node_id: node_id.into(),
            target_id: target_id.into(),
        }
    }

    pub fn permission_denied(
        kb_id: impl Into<String>,
        user_id: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            kb_id: kb_id.into(),
            user_id: user_id.into(),
            level: level.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(context: impl Into<String>) -> Self {
        Self::Conflict {
            context: context.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::SelfMove { .. } | Self::CycleRejected { .. } => ErrorKind::CycleRejected,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Only lock conflicts are worth retrying from scratch
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<DatabaseError> for TreeServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Busy { context } => Self::Conflict { context },
            other => Self::StorageUnavailable(other),
        }
    }
}

impl From<ValidationError> for TreeServiceError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<OrderingError> for TreeServiceError {
    fn from(err: OrderingError) -> Self {
        match err {
            // The anchor was read in the same transaction, so losing it means
            // the sibling group changed underneath us.
            OrderingError::AnchorNotFound(id) => {
                Self::conflict(format!("sibling {} left its group during the move", id))
            }
            OrderingError::KeySpaceExhausted(_) => Self::InvalidArgument(err.to_string()),
        }
    }
}
