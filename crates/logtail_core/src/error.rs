//! Error types for log reading and tail scanning.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while reading the transaction log.
///
/// Note that a corrupt or truncated segment tail is *not* an error: the
/// entry reader reports it as an explicit outcome and the tail scanner
/// treats it as input. These variants cover the conditions that genuinely
/// abort a scan.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Channel error from the storage layer.
    #[error("storage error: {0}")]
    Storage(#[from] logtail_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The log is structurally invalid in a way that cannot be attributed
    /// to a crashed write, for example an entry too large to encode.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// A segment header declares a format version this build cannot read.
    #[error("unsupported log format version {version} in segment {segment_version}")]
    UnsupportedFormat {
        /// The declared format version.
        version: u8,
        /// The segment whose header declared it.
        segment_version: u64,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported_format(version: u8, segment_version: u64) -> Self {
        Self::UnsupportedFormat {
            version,
            segment_version,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
