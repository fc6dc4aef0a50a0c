//! Error types for channel operations.

use std::io;
use thiserror::Error;

/// Result type for channel operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during channel operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The channel is closed.
    #[error("channel is closed")]
    Closed,
}
