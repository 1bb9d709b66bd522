//! Error types for daybook store operations.

use thiserror::Error;

/// Errors that can occur during `SqliteStore` operations.
#[derive(Error, Debug)]
pub enum SqliteStoreError {
    /// SQLite reported a failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to encode or decode a JSON column.
    #[error("Failed to encode tags: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to render a timestamp.
    #[error("Failed to format timestamp: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// Failed to read a stored timestamp.
    #[error("Failed to parse timestamp: {0}")]
    TimeParse(#[from] time::error::Parse),

    /// A row held a value outside the domain.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Failed to acquire the connection lock.
    #[error("Connection lock poisoned")]
    LockError,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, SqliteStoreError>;
