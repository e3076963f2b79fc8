//! Error types for scan-relay.

use std::path::PathBuf;

/// Startup and wiring errors for the relay process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Lookup table could not be loaded.
    #[error("failed to load lookup table {path}: {source}")]
    Lookup {
        /// Path to the table.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage layer errors.
///
/// Never translated into "no record": callers must be able to tell an empty
/// store from a broken one.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row no longer passes validation.
    #[error("corrupt record: {reason}")]
    Corrupt {
        /// What failed to validate.
        reason: String,
    },

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },
}

/// Errors returned by [`crate::service::RelayService`].
///
/// Pending and lost consume races are not errors; they are
/// [`crate::service::PullOutcome::Pending`].
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Session identifier failed validation.
    #[error("invalid session")]
    InvalidSession,

    /// Code failed validation.
    #[error("invalid code")]
    InvalidCode,

    /// The record could not be written.
    #[error("write failed: {0}")]
    WriteFailed(#[source] StorageError),

    /// The store could not be read.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StorageError),
}

/// The public error vocabulary: what a client is allowed to learn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed session or code. Which one is not disclosed.
    InvalidInput,
    /// The storage medium failed.
    StorageFailure,
}

impl RelayError {
    /// Collapse into the public vocabulary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSession | Self::InvalidCode => ErrorKind::InvalidInput,
            Self::WriteFailed(_) | Self::StorageUnavailable(_) => ErrorKind::StorageFailure,
        }
    }
}

impl From<relay_types::ValidationError> for RelayError {
    fn from(e: relay_types::ValidationError) -> Self {
        match e {
            relay_types::ValidationError::InvalidSession => Self::InvalidSession,
            relay_types::ValidationError::InvalidCode => Self::InvalidCode,
        }
    }
}

/// Result type alias for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
