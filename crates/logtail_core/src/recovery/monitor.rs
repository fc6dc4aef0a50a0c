//! Observability hooks for the tail scan.

use crate::recovery::verdict::TailInformation;
use crate::types::LogPosition;

/// Push-only observer of tail scan progress.
///
/// All methods have empty default bodies, so implementors override only
/// what they care about and a no-op can be injected where nothing listens.
/// Hooks return `()` and are invoked in event order; they cannot fail and
/// therefore cannot alter the verdict.
pub trait TailScanMonitor {
    /// A segment channel was opened. A scan may open the same segment more
    /// than once: the backward walk and the forward extraction from a
    /// checkpoint target each open the segments they read.
    fn on_segment_opened(&self, _segment_version: u64) {}

    /// A segment could not be read to its end. Bytes from `position`
    /// onward are treated as absent; the scan continues. Each distinct
    /// corruption position is reported at most once per scan, even when
    /// both scan passes run into it.
    fn on_corrupted_log_file(&self, _segment_version: u64, _position: LogPosition, _reason: &str) {}

    /// The scan finished and produced a verdict.
    fn on_scan_complete(&self, _tail: &TailInformation) {}
}

/// A monitor that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl TailScanMonitor for NullMonitor {}
