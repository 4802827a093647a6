//! Error types for the reconciliation core.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while mapping, resolving or cleaning records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A mapping could not be constructed against its local entity.
    #[error("invalid mapping for {entity}: {message}")]
    InvalidMapping {
        /// Local entity type the mapping targets.
        entity: String,
        /// Description of the problem.
        message: String,
    },

    /// The remote store rejected or failed a request.
    #[error("remote store error: {message}")]
    Remote {
        /// Error message.
        message: String,
        /// Whether the failure is transient.
        retryable: bool,
    },

    /// The local store rejected a write.
    #[error("local store error: {0}")]
    Local(String),

    /// A uniqueness constraint on a lookup column was violated.
    #[error("{entity}.{column} already holds {value}")]
    Conflict {
        /// Local entity type.
        entity: String,
        /// Constrained column.
        column: String,
        /// Duplicated value.
        value: String,
    },

    /// A local row could not be found.
    #[error("{entity} row {id} not found")]
    NotFound {
        /// Local entity type.
        entity: String,
        /// Row id.
        id: u64,
    },

    /// A pending row reference points at a row that is not persisted yet.
    #[error("row {position} references pending row {index}")]
    InvalidReference {
        /// Index the reference points to.
        index: usize,
        /// Position of the row holding the reference.
        position: usize,
    },

    /// A condition predicate could not be understood by the store.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The local store does not know the entity type.
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),
}

impl SyncError {
    /// Creates an invalid mapping error.
    pub fn invalid_mapping(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Creates a transient remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a permanent remote error.
    pub fn remote_fatal(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote { retryable, .. } => *retryable,
            SyncError::Conflict { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::remote_retryable("connection reset").is_retryable());
        assert!(!SyncError::remote_fatal("INVALID_FIELD").is_retryable());
        assert!(SyncError::Conflict {
            entity: "accounts".into(),
            column: "remote_id".into(),
            value: "001".into(),
        }
        .is_retryable());
        assert!(!SyncError::Local("NOT NULL constraint failed".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::invalid_mapping("custom_objects", "missing remote id column");
        assert_eq!(
            err.to_string(),
            "invalid mapping for custom_objects: missing remote id column"
        );

        let err = SyncError::NotFound {
            entity: "users".into(),
            id: 7,
        };
        assert_eq!(err.to_string(), "users row 7 not found");
    }
}
