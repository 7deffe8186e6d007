//! Error types for the bulk order engine
//!
//! Two families of errors live here:
//!
//! - [`IngestError`] - batch-level failures. These abort an ingestion before any
//!   row outcome exists (unreadable file, zero rows, broken header) or report a
//!   fault in the batch bookkeeping itself.
//! - [`RepositoryError`] - failures reported by the persistence collaborators.
//!   Inside row processing these are recovered into a row outcome and never
//!   abort the batch.
//!
//! Row-level validation problems are not errors in this sense; they are
//! [`FieldError`](crate::types::FieldError) values carried by a row outcome.

use crate::types::{BatchId, BatchStatus};
use thiserror::Error;

/// Batch-level error for the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// Input file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV layer could not decode the input at all
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The input has no usable structure (no header, no known columns)
    #[error("Structurally invalid input: {reason}")]
    Structural {
        /// Why the input was rejected
        reason: String,
    },

    /// The input decoded cleanly but contained no data rows
    ///
    /// The batch was recorded as FAILED under `batch_id` when one was opened.
    #[error("No rows to ingest{}", batch_id.as_ref().map(|b| format!(" (batch {})", b)).unwrap_or_default())]
    NoRows {
        /// Batch recorded as FAILED, if any
        batch_id: Option<BatchId>,
    },

    /// A batch was asked to make a transition its lifecycle forbids
    #[error("Invalid batch transition for {batch_id}: {from} -> {to}")]
    InvalidTransition {
        /// Batch being transitioned
        batch_id: BatchId,
        /// Current status
        from: BatchStatus,
        /// Requested status
        to: BatchStatus,
    },

    /// The batch record could not be stored or read
    #[error("Batch repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The snapshot file could not be read or written
    #[error("Snapshot error: {message}")]
    Snapshot {
        /// Description of the snapshot failure
        message: String,
    },

    /// The task driving a batch stopped without producing a result
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

/// Error reported by an order or batch repository
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached
    #[error("Repository unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },

    /// An insert collided with the uniqueness constraint on (scope, key)
    #[error("Unique constraint violated for key '{key}' in scope '{scope}'")]
    UniqueViolation {
        /// Scope of the colliding key
        scope: String,
        /// The colliding key value
        key: String,
    },

    /// A record expected to exist was not found
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Record identifier
        id: String,
    },

    /// Any other storage failure
    #[error("Repository internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for IngestError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            return IngestError::FileNotFound {
                path: error.to_string(),
            };
        }
        IngestError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for IngestError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        IngestError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(error: serde_json::Error) -> Self {
        IngestError::Snapshot {
            message: error.to_string(),
        }
    }
}

impl IngestError {
    /// Create a FileNotFound error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        IngestError::FileNotFound { path: path.into() }
    }

    /// Map a failure to open `path` for reading
    pub fn open_failed(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            return IngestError::file_not_found(path.display().to_string());
        }
        IngestError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), error),
        }
    }

    /// Create a Structural error
    pub fn structural(reason: impl Into<String>) -> Self {
        IngestError::Structural {
            reason: reason.into(),
        }
    }

    /// Create a NoRows error
    pub fn no_rows(batch_id: Option<BatchId>) -> Self {
        IngestError::NoRows { batch_id }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(batch_id: BatchId, from: BatchStatus, to: BatchStatus) -> Self {
        IngestError::InvalidTransition { batch_id, from, to }
    }

    /// Create a Snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        IngestError::Snapshot {
            message: message.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        IngestError::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the input itself was unusable
    ///
    /// These are the failures that put a batch into FAILED.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            IngestError::Structural { .. }
                | IngestError::NoRows { .. }
                | IngestError::ParseError { .. }
        )
    }
}

impl RepositoryError {
    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        RepositoryError::Unavailable {
            message: message.into(),
        }
    }

    /// Create a UniqueViolation error
    pub fn unique_violation(scope: impl Into<String>, key: impl Into<String>) -> Self {
        RepositoryError::UniqueViolation {
            scope: scope.into(),
            key: key.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        RepositoryError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_not_found(
        IngestError::FileNotFound { path: "orders.csv".to_string() },
        "File not found: orders.csv"
    )]
    #[case::io_error(
        IngestError::IoError { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_error_with_line(
        IngestError::ParseError { line: Some(7), message: "invalid utf-8".to_string() },
        "CSV parse error at line 7: invalid utf-8"
    )]
    #[case::parse_error_without_line(
        IngestError::ParseError { line: None, message: "invalid utf-8".to_string() },
        "CSV parse error: invalid utf-8"
    )]
    #[case::structural(
        IngestError::Structural { reason: "missing header".to_string() },
        "Structurally invalid input: missing header"
    )]
    #[case::no_rows_without_batch(
        IngestError::NoRows { batch_id: None },
        "No rows to ingest"
    )]
    #[case::unique_violation(
        IngestError::Repository(RepositoryError::unique_violation("acme", "REF-1")),
        "Batch repository error: Unique constraint violated for key 'REF-1' in scope 'acme'"
    )]
    #[case::unavailable(
        IngestError::Repository(RepositoryError::unavailable("connection refused")),
        "Batch repository error: Repository unavailable: connection refused"
    )]
    fn test_error_display(#[case] error: IngestError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_invalid_transition_display() {
        let batch_id = BatchId::new();
        let error =
            IngestError::invalid_transition(batch_id.clone(), BatchStatus::Completed, BatchStatus::Processing);
        assert_eq!(
            error.to_string(),
            format!("Invalid batch transition for {}: COMPLETED -> PROCESSING", batch_id)
        );
    }

    #[rstest]
    #[case::structural(IngestError::structural("no header"), true)]
    #[case::no_rows(IngestError::no_rows(None), true)]
    #[case::parse(IngestError::ParseError { line: None, message: "bad".to_string() }, true)]
    #[case::io(IngestError::IoError { message: "disk".to_string() }, false)]
    #[case::repository(IngestError::Repository(RepositoryError::internal("boom")), false)]
    fn test_is_structural(#[case] error: IngestError, #[case] expected: bool) {
        assert_eq!(error.is_structural(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: IngestError = io_error.into();
        assert!(matches!(error, IngestError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_io_not_found_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "orders.csv");
        let error: IngestError = io_error.into();
        assert!(matches!(error, IngestError::FileNotFound { .. }));
    }
}
