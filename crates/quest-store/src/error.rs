//! Error types for the local progress store

use quest_types::RecordId;
use std::fmt;
use std::path::PathBuf;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Task,
    Goal,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => f.write_str("Task"),
            Self::Goal => f.write_str("Goal"),
        }
    }
}

/// Errors from the local progress store
///
/// The record-state variants render as short user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error in a file backend
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored value is not valid JSON for its key
    #[error("corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// No record with that id
    #[error("{kind} not found")]
    NotFound { kind: RecordKind, id: RecordId },

    /// Record is already completed
    #[error("{kind} already completed")]
    AlreadyCompleted { kind: RecordKind, id: RecordId },

    /// A completion for the record is in flight
    #[error("{kind} completion already pending")]
    CompletionPending { kind: RecordKind, id: RecordId },

    /// Commit or abort without a pending completion
    #[error("{kind} has no pending completion")]
    NotPending { kind: RecordKind, id: RecordId },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error describes record state rather than storage failure
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyCompleted { .. }
                | Self::CompletionPending { .. }
                | Self::NotPending { .. }
        )
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_messages() {
        let id = RecordId::new();
        assert_eq!(
            StoreError::NotFound {
                kind: RecordKind::Task,
                id
            }
            .to_string(),
            "Task not found"
        );
        assert_eq!(
            StoreError::AlreadyCompleted {
                kind: RecordKind::Goal,
                id
            }
            .to_string(),
            "Goal already completed"
        );
        assert_eq!(
            StoreError::CompletionPending {
                kind: RecordKind::Task,
                id
            }
            .to_string(),
            "Task completion already pending"
        );
    }

    #[test]
    fn io_is_not_precondition() {
        let err = StoreError::io_error("/tmp/x", std::io::Error::other("disk full"));
        assert!(!err.is_precondition());
    }
}
