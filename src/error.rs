//! Error types for Book Tracker
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the layer that raises them so the boundary (CLI or any
//! web layer built on top) can map them to a response without inspecting
//! driver internals.
//!
//! ## Categories
//!
//! ### Validation (caller-correctable)
//! - `MissingId`, `InvalidId`, `MissingTitle`, `MissingAuthor`
//! - `EmptyStatus`, `InvalidStatus`
//! - `InvalidPagination` (raised by the boundary service, never by the store)
//!
//! ### Lookup
//! - `NotFound`: no row matched, derived from affected-row counts on mutations
//!
//! ### Storage
//! - `Storage`: a gateway query failed; carries the logical operation name
//! - `Database`, `MigrationFailed`: pool setup and schema failures
//!
//! ### Execution
//! - `Cancelled`, `DeadlineExceeded`: the caller's `OpContext` fired

use thiserror::Error;

/// Store-neutral cause carried by [`TrackerError::Storage`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias using our TrackerError type
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for Book Tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    // ===== Validation Errors =====

    /// Book has no id
    #[error("id is missing")]
    MissingId,

    /// Book id is not a UUID
    #[error("id is invalid")]
    InvalidId,

    /// Title is empty after trimming
    #[error("title is missing")]
    MissingTitle,

    /// Author is empty after trimming
    #[error("author is missing")]
    MissingAuthor,

    /// Status is empty after trimming
    #[error("status cannot be empty")]
    EmptyStatus,

    /// Status is outside the closed enumeration; carries the normalized value
    #[error("invalid status: must be unread, reading or complete: {0}")]
    InvalidStatus(String),

    /// Limit or offset outside the accepted bounds
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    // ===== Lookup Errors =====

    /// No book with the given id
    #[error("book not found: {0}")]
    NotFound(String),

    // ===== Storage Errors =====

    /// A gateway query failed
    #[error("{operation}: {source}")]
    Storage {
        /// Logical operation, e.g. "insert book"
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// Database driver error during pool setup or maintenance
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Generic file I/O error
    #[error("File I/O error: {0}")]
    FileIoError(String),

    /// Configuration value could not be parsed
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ===== Execution Errors =====

    /// The caller cancelled the operation
    #[error("{operation}: operation cancelled")]
    Cancelled { operation: &'static str },

    /// The caller's deadline passed before the operation finished
    #[error("{operation}: deadline exceeded")]
    DeadlineExceeded { operation: &'static str },
}

/// Closed set of error kinds, comparable with `==`
///
/// Use this instead of matching on `TrackerError` when only the category
/// matters, e.g. in tests or when choosing a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingId,
    InvalidId,
    MissingTitle,
    MissingAuthor,
    EmptyStatus,
    InvalidStatus,
    InvalidPagination,
    NotFound,
    Storage,
    Configuration,
    Cancelled,
    DeadlineExceeded,
}

// Helper methods for creating common errors
impl TrackerError {
    /// Create a NotFound error for a book id
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        TrackerError::NotFound(id.into())
    }

    /// Create an InvalidPagination error with a message
    pub fn invalid_pagination<S: Into<String>>(message: S) -> Self {
        TrackerError::InvalidPagination(message.into())
    }

    /// Wrap a store failure with the operation that produced it
    pub fn storage<E: Into<BoxError>>(operation: &'static str, source: E) -> Self {
        TrackerError::Storage {
            operation,
            source: source.into(),
        }
    }

    /// Closure form of [`TrackerError::storage`] for `map_err` on driver calls
    pub(crate) fn storage_in(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| TrackerError::storage(operation, source)
    }

    /// Project the error onto its kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::MissingId => ErrorKind::MissingId,
            TrackerError::InvalidId => ErrorKind::InvalidId,
            TrackerError::MissingTitle => ErrorKind::MissingTitle,
            TrackerError::MissingAuthor => ErrorKind::MissingAuthor,
            TrackerError::EmptyStatus => ErrorKind::EmptyStatus,
            TrackerError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            TrackerError::InvalidPagination(_) => ErrorKind::InvalidPagination,
            TrackerError::NotFound(_) => ErrorKind::NotFound,
            TrackerError::Storage { .. }
            | TrackerError::Database(_)
            | TrackerError::MigrationFailed(_)
            | TrackerError::FileIoError(_) => ErrorKind::Storage,
            TrackerError::ConfigurationError(_) => ErrorKind::Configuration,
            TrackerError::Cancelled { .. } => ErrorKind::Cancelled,
            TrackerError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }

    /// Check if the caller can fix the error by changing its input
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingId
                | ErrorKind::InvalidId
                | ErrorKind::MissingTitle
                | ErrorKind::MissingAuthor
                | ErrorKind::EmptyStatus
                | ErrorKind::InvalidStatus
                | ErrorKind::InvalidPagination
        )
    }

    /// Check if the error means the book does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if error is retryable
    ///
    /// Returns `true` for deadline expiry and for SQLite busy/locked
    /// conditions surfaced as pool timeouts or I/O failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::DeadlineExceeded { .. } => true,
            TrackerError::Storage { source, .. } => source
                .downcast_ref::<sqlx::Error>()
                .map_or(false, is_transient),
            TrackerError::Database(source) => is_transient(source),
            _ => false,
        }
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::NotFound(id) => format!("No book with id '{}' exists.", id),
            TrackerError::InvalidStatus(value) => format!(
                "'{}' is not a valid status. Use one of: unread, reading, complete.",
                value
            ),
            TrackerError::DeadlineExceeded { operation } => {
                format!("Timed out while trying to {}. Please try again.", operation)
            }
            TrackerError::Cancelled { .. } => "Operation cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}

fn is_transient(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_equality() {
        assert_eq!(TrackerError::MissingTitle.kind(), ErrorKind::MissingTitle);
        assert_ne!(TrackerError::MissingTitle.kind(), ErrorKind::MissingAuthor);
        assert_eq!(
            TrackerError::InvalidStatus("done".into()).kind(),
            ErrorKind::InvalidStatus
        );
    }

    #[test]
    fn test_invalid_status_message_embeds_value() {
        let err = TrackerError::InvalidStatus("finished".to_string());
        assert_eq!(
            err.to_string(),
            "invalid status: must be unread, reading or complete: finished"
        );
    }

    #[test]
    fn test_storage_error_carries_operation() {
        let err = TrackerError::storage("insert book", sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().starts_with("insert book: "));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_storage_error_from_plain_message() {
        let err = TrackerError::storage("insert book", "duplicate book id abc".to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.to_string(), "insert book: duplicate book id abc");
        assert!(!err.is_retryable());

        let err = TrackerError::storage("get book", sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(TrackerError::EmptyStatus.is_validation());
        assert!(TrackerError::invalid_pagination("limit").is_validation());
        assert!(TrackerError::not_found("abc").is_not_found());
        assert!(TrackerError::DeadlineExceeded { operation: "get book" }.is_retryable());
        assert!(!TrackerError::Cancelled { operation: "get book" }.is_retryable());
    }
}
