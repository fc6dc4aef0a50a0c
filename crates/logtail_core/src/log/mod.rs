//! Transaction log format and segment file access.
//!
//! The log is an ordered sequence of **segment files**, each named
//! `<prefix>.<version>` with monotonically increasing versions. A segment
//! begins with a [`LogEntry::Header`] at offset 0; entries follow without
//! padding.
//!
//! ## Entry frame
//!
//! ```text
//! | tag (1) | payload (N) | crc32c (4) |
//! ```
//!
//! All integers are big-endian. The CRC32C covers the tag and payload.
//! Variable-length payload fields carry a 4-byte length prefix.
//!
//! ## Reading policy
//!
//! [`EntryReader`] distinguishes three outcomes at every step:
//!
//! - An entry decoded successfully
//! - **Clean end**: EOF exactly at an entry boundary
//! - **Corrupt**: unknown tag, checksum mismatch, or EOF mid-entry
//!
//! Corruption is an explicit value, never an `Err` - the tail scanner
//! consumes it as evidence about the log, while real I/O failures and
//! unsupported format versions propagate as errors.

mod entry;
mod files;
mod reader;
mod writer;

pub use entry::{compute_crc32c, EntryTag, LogEntry, BASE_CHECKSUM, LATEST_FORMAT_VERSION};
pub use files::{LogFileSet, DEFAULT_SEGMENT_PREFIX};
pub use reader::{EntryReader, ReadOutcome};
pub use writer::LogWriter;
