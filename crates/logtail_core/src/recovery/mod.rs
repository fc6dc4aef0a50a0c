//! Startup tail scanning for crash recovery.
//!
//! Before a store can serve traffic, the recovery collaborator must know
//! whether the transaction log holds work that is not yet reflected in the
//! store: transactions started or committed after the latest checkpoint, a
//! tail cut short by a crash, or no checkpoint at all. [`TailScanner`]
//! answers that with a single backward walk over the segment files,
//! producing an immutable [`TailInformation`] verdict.
//!
//! The scanner only reads. It makes no repair attempt and defers the
//! decision of what to do about the verdict entirely to its caller.

mod monitor;
mod tail_scanner;
mod verdict;

pub use monitor::{NullMonitor, TailScanMonitor};
pub use tail_scanner::TailScanner;
pub use verdict::{CheckPoint, TailInformation};
