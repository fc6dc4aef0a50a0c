//! The tail scan verdict.

use crate::types::{LogPosition, StoreId, NO_TRANSACTION_ID};

/// A checkpoint found during the tail scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckPoint {
    /// Position of the checkpoint entry itself.
    pub position: LogPosition,
    /// Position the store is durable up to. Never forward of `position`.
    pub target: LogPosition,
}

/// Result of scanning the transaction log tail.
///
/// Built once per scan and handed to the recovery collaborator, which
/// decides what to do about it; the scanner itself only reports. Two scans
/// over an unchanged file set produce equal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailInformation {
    /// The latest checkpoint by entry position, if any exists.
    pub last_check_point: Option<CheckPoint>,

    /// Whether transaction evidence (a Start or Commit) exists after the
    /// latest checkpoint - or anywhere, when no checkpoint exists. A Start
    /// without a matching Commit counts: a transaction that was started
    /// and lost is itself something recovery must consider.
    pub commits_after_last_check_point: bool,

    /// Transaction id of the first commit after the latest checkpoint, or
    /// [`NO_TRANSACTION_ID`] when no complete commit follows it.
    pub first_tx_id_after_last_check_point: i64,

    /// Lowest segment version the scan actually opened and parsed, or `-1`
    /// when no segments exist.
    pub oldest_segment_version_found: i64,

    /// Highest segment version on disk, or `-1` when no segments exist.
    pub latest_segment_version: i64,

    /// True when no segment files exist at all.
    pub logs_missing: bool,

    /// True when some segment tail could not be read to its end.
    pub corrupt_tail_seen: bool,

    /// Format version declared by the newest readable segment header, or
    /// `0` when no header was found.
    pub latest_entry_format_version: u8,

    /// Store identity from the newest readable segment header.
    pub store_id: StoreId,
}

impl TailInformation {
    /// The verdict for a log directory containing no segment files.
    ///
    /// Without logs the store's durability state cannot be reconstructed;
    /// whether that is a fresh database or a disaster is the collaborator's
    /// call.
    #[must_use]
    pub fn missing_logs() -> Self {
        Self {
            last_check_point: None,
            commits_after_last_check_point: false,
            first_tx_id_after_last_check_point: NO_TRANSACTION_ID,
            oldest_segment_version_found: -1,
            latest_segment_version: -1,
            logs_missing: true,
            corrupt_tail_seen: false,
            latest_entry_format_version: 0,
            store_id: StoreId::UNKNOWN,
        }
    }

    /// Whether the store must run recovery before serving traffic.
    ///
    /// True when logs are missing, when transaction evidence follows the
    /// latest checkpoint, when a corrupt tail was seen, or when no
    /// checkpoint exists at all.
    #[must_use]
    pub fn is_recovery_required(&self) -> bool {
        self.logs_missing
            || self.commits_after_last_check_point
            || self.corrupt_tail_seen
            || self.last_check_point.is_none()
    }
}
