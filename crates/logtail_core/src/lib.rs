//! # logtail core
//!
//! Transaction log format, segment file management and tail scanning.
//!
//! This crate provides:
//! - The binary log entry format (encode/decode with CRC32C framing)
//! - Segment file enumeration and positioned access ([`log::LogFileSet`])
//! - Streaming entry reading with explicit end-vs-corruption outcomes
//! - The startup tail scan that decides whether crash recovery must run
//!   ([`recovery::TailScanner`])
//!
//! ## Tail scanning
//!
//! At startup the recovery collaborator asks [`recovery::TailScanner`] for a
//! [`recovery::TailInformation`] verdict. The scanner walks segment files
//! from the newest version downward, finds the latest checkpoint, and
//! determines independently whether any transaction evidence exists after
//! that checkpoint:
//!
//! ```no_run
//! use logtail_core::log::LogFileSet;
//! use logtail_core::recovery::TailScanner;
//! use std::path::Path;
//!
//! # fn main() -> logtail_core::error::CoreResult<()> {
//! let files = LogFileSet::new(Path::new("data/txlogs"));
//! let scanner = TailScanner::new(files);
//! let tail = scanner.scan_tail()?;
//! if tail.is_recovery_required() {
//!     // replay from tail.last_check_point
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Corruption policy
//!
//! A truncated or garbled segment tail is an expected input (a crash
//! mid-write), not a failure: the bytes from the first unreadable entry
//! onward are treated as absent, the verdict is computed from everything
//! before them, and the condition is reported through the verdict and the
//! monitor hooks. Only genuine I/O failures and unsupported format versions
//! abort the scan.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod log;
pub mod recovery;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::{LogPosition, StoreId, NO_TRANSACTION_ID};
