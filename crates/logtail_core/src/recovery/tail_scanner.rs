//! The log tail scanner.

use crate::error::CoreResult;
use crate::log::{EntryReader, LogEntry, LogFileSet, ReadOutcome};
use crate::recovery::monitor::{NullMonitor, TailScanMonitor};
use crate::recovery::verdict::{CheckPoint, TailInformation};
use crate::types::{LogPosition, StoreId, NO_TRANSACTION_ID};
use tracing::{debug, warn};

/// Scans the transaction log tail at startup.
///
/// The scanner walks segment versions from the highest downward, reading
/// entries forward within each segment. The first segment containing a
/// checkpoint terminates the walk: the last checkpoint in that segment is
/// the latest one overall. The scanner then determines independently
/// whether any transaction evidence exists after that checkpoint's target
/// position, and which committed transaction comes first after it.
///
/// One scan is single-threaded, opens one segment channel at a time and
/// releases it before the next, and requires exclusive read access to the
/// segment files for its duration - a lifecycle contract enforced by the
/// caller. Scanning an unchanged file set twice produces equal verdicts.
///
/// A corrupt or truncated tail never aborts the scan; it is recorded in
/// the verdict and reported to the monitor. I/O failures and unsupported
/// format versions abort without a verdict.
pub struct TailScanner {
    files: LogFileSet,
    monitor: Box<dyn TailScanMonitor>,
}

/// What one backward-walked segment contributed to the scan.
#[derive(Debug, Default)]
struct SegmentScan {
    /// Format version and store id from the segment header.
    header: Option<(u8, StoreId)>,
    /// Last checkpoint in the segment, latest by position.
    last_check_point: Option<CheckPoint>,
    /// Position of the last Start entry in the segment.
    last_start_position: Option<LogPosition>,
    /// Position of the last Commit entry in the segment.
    last_commit_position: Option<LogPosition>,
    /// Transaction id of the first Commit in the segment.
    first_commit_tx: i64,
    /// Whether any Commit entry was seen.
    commit_seen: bool,
    /// Where the segment became unreadable, if it did.
    corrupt: Option<(LogPosition, String)>,
    /// True when the segment has no valid header and is treated as absent.
    absent: bool,
}

/// Result of the forward search from a checkpoint target.
#[derive(Debug)]
struct Extraction {
    /// First Commit entry at or after the target, if any.
    tx_id: i64,
    /// Whether any Start entry was observed. The search begins at the
    /// target, so every observed Start lies at or after it - including
    /// ones in segments the backward walk never descended to.
    start_seen: bool,
    lowest_parsed: Option<u64>,
    corrupt: bool,
}

impl TailScanner {
    /// Creates a scanner with a no-op monitor.
    #[must_use]
    pub fn new(files: LogFileSet) -> Self {
        Self::with_monitor(files, Box::new(NullMonitor))
    }

    /// Creates a scanner that reports progress to `monitor`.
    #[must_use]
    pub fn with_monitor(files: LogFileSet, monitor: Box<dyn TailScanMonitor>) -> Self {
        Self { files, monitor }
    }

    /// Returns the file set being scanned.
    #[must_use]
    pub fn files(&self) -> &LogFileSet {
        &self.files
    }

    /// Scans the log tail and produces the recovery verdict.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when a segment header declares
    /// an unsupported format version. Corruption within the stream is not
    /// an error; it is reflected in the verdict.
    pub fn scan_tail(&self) -> CoreResult<TailInformation> {
        let versions = self.files.versions()?;
        let Some(&highest) = versions.last() else {
            debug!("no log segments found");
            let tail = TailInformation::missing_logs();
            self.monitor.on_scan_complete(&tail);
            return Ok(tail);
        };

        let mut oldest_parsed: Option<u64> = None;
        let mut corrupt_tail_seen = false;
        let mut reported_corruptions: Vec<LogPosition> = Vec::new();
        let mut last_start_position: Option<LogPosition> = None;
        let mut last_commit_position: Option<LogPosition> = None;
        let mut first_commit_tx = NO_TRANSACTION_ID;
        let mut commit_seen = false;
        let mut latest_entry_format_version = 0u8;
        let mut store_id = StoreId::UNKNOWN;
        let mut newest_header_recorded = false;
        let mut found_check_point: Option<CheckPoint> = None;

        for &version in versions.iter().rev() {
            let scan = self.scan_segment(version)?;
            if scan.absent {
                continue;
            }

            if !newest_header_recorded {
                if let Some((format_version, id)) = scan.header {
                    latest_entry_format_version = format_version;
                    store_id = id;
                    newest_header_recorded = true;
                }
            }

            oldest_parsed = Some(version);

            if let Some((position, reason)) = &scan.corrupt {
                corrupt_tail_seen = true;
                reported_corruptions.push(*position);
                self.monitor
                    .on_corrupted_log_file(version, *position, reason);
            }

            // Walking newest to oldest, the first Start recorded is the
            // latest by position; keep the maximum regardless.
            if let Some(position) = scan.last_start_position {
                if last_start_position.map_or(true, |p| position > p) {
                    last_start_position = Some(position);
                }
            }
            if let Some(position) = scan.last_commit_position {
                if last_commit_position.map_or(true, |p| position > p) {
                    last_commit_position = Some(position);
                }
            }

            // An older segment's first commit is earlier than anything
            // recorded so far, so it overwrites.
            if scan.first_commit_tx != NO_TRANSACTION_ID {
                first_commit_tx = scan.first_commit_tx;
            }
            commit_seen |= scan.commit_seen;

            if let Some(check_point) = scan.last_check_point {
                found_check_point = Some(check_point);
                break;
            }
        }

        let tail = match found_check_point {
            Some(check_point) => {
                debug!(
                    position = %check_point.position,
                    target = %check_point.target,
                    "latest checkpoint found"
                );
                let extraction = self.extract_first_tx_after(
                    &versions,
                    check_point.target,
                    &reported_corruptions,
                )?;
                corrupt_tail_seen |= extraction.corrupt;

                // A Start at or after the target counts even without a
                // matching Commit: both passes contribute what they saw.
                let start_at_or_after_target = extraction.start_seen
                    || last_start_position.map_or(false, |p| p >= check_point.target);
                let commit_after_target =
                    last_commit_position.map_or(false, |p| p > check_point.target);

                let oldest = [oldest_parsed, extraction.lowest_parsed]
                    .into_iter()
                    .flatten()
                    .min();

                TailInformation {
                    last_check_point: Some(check_point),
                    commits_after_last_check_point: extraction.tx_id != NO_TRANSACTION_ID
                        || start_at_or_after_target
                        || commit_after_target,
                    first_tx_id_after_last_check_point: extraction.tx_id,
                    oldest_segment_version_found: oldest.map_or(-1, |v| v as i64),
                    latest_segment_version: highest as i64,
                    logs_missing: false,
                    corrupt_tail_seen,
                    latest_entry_format_version,
                    store_id,
                }
            }
            None => TailInformation {
                last_check_point: None,
                commits_after_last_check_point: last_start_position.is_some() || commit_seen,
                first_tx_id_after_last_check_point: first_commit_tx,
                oldest_segment_version_found: oldest_parsed.map_or(-1, |v| v as i64),
                latest_segment_version: highest as i64,
                logs_missing: false,
                corrupt_tail_seen,
                latest_entry_format_version,
                store_id,
            },
        };

        debug!(recovery_required = tail.is_recovery_required(), "tail scan complete");
        self.monitor.on_scan_complete(&tail);
        Ok(tail)
    }

    /// Reads one segment forward from its start, collecting everything the
    /// backward walk needs.
    fn scan_segment(&self, version: u64) -> CoreResult<SegmentScan> {
        self.monitor.on_segment_opened(version);
        debug!(version, "scanning log segment");

        let channel = self.files.open(version)?;
        let mut reader = EntryReader::new(version, channel, 0)?;

        let mut scan = SegmentScan {
            first_commit_tx: NO_TRANSACTION_ID,
            ..SegmentScan::default()
        };
        let mut first = true;

        loop {
            match reader.next_entry()? {
                ReadOutcome::Entry(position, entry) => {
                    if first {
                        first = false;
                        match &entry {
                            LogEntry::Header {
                                format_version,
                                segment_version,
                                store_id,
                            } if *segment_version == version => {
                                scan.header = Some((*format_version, *store_id));
                                continue;
                            }
                            _ => {
                                warn!(version, "segment has no valid header, treating as absent");
                                scan.absent = true;
                                return Ok(scan);
                            }
                        }
                    }

                    match entry {
                        LogEntry::Start { .. } => {
                            scan.last_start_position = Some(position);
                        }
                        LogEntry::Commit { tx_id, .. } => {
                            if scan.first_commit_tx == NO_TRANSACTION_ID {
                                scan.first_commit_tx = tx_id;
                            }
                            scan.last_commit_position = Some(position);
                            scan.commit_seen = true;
                        }
                        LogEntry::CheckPoint { target } => {
                            scan.last_check_point = Some(CheckPoint { position, target });
                        }
                        LogEntry::Header { .. }
                        | LogEntry::Command { .. }
                        | LogEntry::Rollback { .. } => {}
                    }
                }
                ReadOutcome::CleanEnd => {
                    if first {
                        warn!(version, "segment has no valid header, treating as absent");
                        scan.absent = true;
                    }
                    return Ok(scan);
                }
                ReadOutcome::Corrupt { position, reason } => {
                    if first {
                        warn!(version, "segment has no valid header, treating as absent");
                        scan.absent = true;
                    } else {
                        warn!(version, %position, %reason, "segment tail unreadable");
                        scan.corrupt = Some((position, reason));
                    }
                    return Ok(scan);
                }
            }
        }
    }

    /// Searches forward from `target` through the highest segment for the
    /// first Commit entry, recording any Start entry seen on the way.
    ///
    /// The target's own segment is opened at the target offset; every
    /// higher segment present on disk is read from its start. Corruption
    /// stops the search and is reported like any other corrupt tail,
    /// except where the backward walk already reported the same position.
    fn extract_first_tx_after(
        &self,
        versions: &[u64],
        target: LogPosition,
        reported_corruptions: &[LogPosition],
    ) -> CoreResult<Extraction> {
        let mut extraction = Extraction {
            tx_id: NO_TRANSACTION_ID,
            start_seen: false,
            lowest_parsed: None,
            corrupt: false,
        };

        for &version in versions
            .iter()
            .filter(|&&v| v >= target.segment_version())
        {
            let start_offset = if version == target.segment_version() {
                target.byte_offset()
            } else {
                0
            };

            self.monitor.on_segment_opened(version);
            let channel = self.files.open(version)?;
            let mut reader = EntryReader::new(version, channel, start_offset)?;
            let mut first = true;

            loop {
                match reader.next_entry()? {
                    ReadOutcome::Entry(_, entry) => {
                        if first {
                            first = false;
                            if start_offset == 0
                                && !matches!(entry, LogEntry::Header { .. })
                            {
                                // Header-less segment, absent for this
                                // search as well.
                                break;
                            }
                            extraction.lowest_parsed.get_or_insert(version);
                        }
                        match entry {
                            LogEntry::Commit { tx_id, .. } => {
                                extraction.tx_id = tx_id;
                                return Ok(extraction);
                            }
                            LogEntry::Start { .. } => {
                                extraction.start_seen = true;
                            }
                            _ => {}
                        }
                    }
                    ReadOutcome::CleanEnd => {
                        // An empty tail after the target still counts as
                        // parsed; an empty non-target segment is absent.
                        if first && start_offset > 0 {
                            extraction.lowest_parsed.get_or_insert(version);
                        }
                        break;
                    }
                    ReadOutcome::Corrupt { position, reason } => {
                        if first && start_offset == 0 {
                            break;
                        }
                        if !reported_corruptions.contains(&position) {
                            warn!(version, %position, %reason, "segment tail unreadable");
                            self.monitor
                                .on_corrupted_log_file(version, position, &reason);
                        }
                        extraction.corrupt = true;
                        return Ok(extraction);
                    }
                }
            }
        }

        Ok(extraction)
    }
}

impl std::fmt::Debug for TailScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailScanner")
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}
