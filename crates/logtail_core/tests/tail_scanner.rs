//! End-to-end tests for the tail scanner over real segment files.

use logtail_core::log::{LogFileSet, LATEST_FORMAT_VERSION};
use logtail_core::recovery::{TailInformation, TailScanMonitor, TailScanner};
use logtail_core::types::{LogPosition, StoreId, NO_TRANSACTION_ID};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Store identity used by every fixture.
const STORE_ID: StoreId = StoreId::new(1_600_000_000_000, 0x5EED);

const END_VERSION: u64 = 43;

#[test]
fn detect_missing_log_files() {
    let dir = tempdir().unwrap();
    let tail = scan(dir.path());

    assert!(tail.logs_missing);
    assert!(tail.is_recovery_required());
    assert_eq!(tail.last_check_point, None);
    assert_eq!(tail.oldest_segment_version_found, -1);
    assert_eq!(tail.latest_segment_version, -1);
}

#[test]
fn one_segment_no_entries() {
    let dir = tempdir().unwrap();
    setup_log_files(dir.path(), END_VERSION, &[segment(&[])]);

    let tail = scan(dir.path());

    assert_latest_check_point(false, false, NO_TRANSACTION_ID, 43, &tail);
    assert!(!tail.logs_missing);
    // No checkpoint at all still means recovery must run.
    assert!(tail.is_recovery_required());
}

#[test]
fn one_segment_start_and_commit() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[Spec::Start, Spec::Commit(10)])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 10, 43, &tail);
}

#[test]
fn two_segments_no_checkpoints() {
    let dir = tempdir().unwrap();
    setup_log_files(dir.path(), END_VERSION, &[segment(&[]), segment(&[])]);

    let tail = scan(dir.path());

    assert_latest_check_point(false, false, NO_TRANSACTION_ID, 42, &tail);
}

#[test]
fn commits_in_older_segment_newest_empty() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[Spec::Start, Spec::Commit(21)]), segment(&[])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 21, 42, &tail);
}

#[test]
fn start_without_commit_counts_as_evidence() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[]), segment(&[Spec::Start])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, NO_TRANSACTION_ID, 42, &tail);
}

#[test]
fn first_of_two_commits_wins() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[]),
            segment(&[Spec::Start, Spec::Commit(21), Spec::Start, Spec::Commit(22)]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 21, 42, &tail);
}

#[test]
fn start_and_commit_in_different_segments() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[Spec::Start]), segment(&[Spec::Commit(6)])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 6, 42, &tail);
}

#[test]
fn checkpoint_only() {
    let dir = tempdir().unwrap();
    setup_log_files(dir.path(), END_VERSION, &[segment(&[Spec::CheckPointSelf])]);

    let tail = scan(dir.path());

    assert_latest_check_point(true, false, NO_TRANSACTION_ID, 43, &tail);
    assert!(!tail.is_recovery_required());
}

#[test]
fn start_and_commit_before_checkpoint() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[Spec::Start, Spec::Commit(1), Spec::CheckPointSelf])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, false, NO_TRANSACTION_ID, 43, &tail);
    assert!(!tail.is_recovery_required());
}

#[test]
fn latest_of_multiple_checkpoints_wins() {
    let dir = tempdir().unwrap();
    let positions = setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[
            Spec::CheckPointSelf,
            Spec::Position("second"),
            Spec::CheckPointSelf,
            Spec::Start,
            Spec::Commit(11),
        ])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, 11, 43, &tail);
    let check_point = tail.last_check_point.unwrap();
    assert_eq!(check_point.position, positions["second"]);
    assert_eq!(check_point.target, positions["second"]);
}

#[test]
fn checkpoint_between_starts() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[
            Spec::CheckPointSelf,
            Spec::Start,
            Spec::Commit(1),
            Spec::CheckPointSelf,
        ])],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, false, NO_TRANSACTION_ID, 43, &tail);
}

#[test]
fn checkpoint_in_older_segment_commits_in_newer() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::CheckPointSelf]),
            segment(&[Spec::Start, Spec::Commit(11)]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, 11, 42, &tail);
}

#[test]
fn checkpoint_in_older_segment_newest_empty() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::Start, Spec::Commit(1), Spec::CheckPointSelf]),
            segment(&[]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, false, NO_TRANSACTION_ID, 42, &tail);
    assert!(!tail.is_recovery_required());
}

#[test]
fn checkpoint_target_in_previous_segment() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::Start, Spec::Commit(5), Spec::Position("p")]),
            segment(&[Spec::Start, Spec::Commit(6)]),
            segment(&[Spec::CheckPointAt("p")]),
        ],
    );

    let tail = scan(dir.path());

    // The scan descends to the segment holding the target, so the target's
    // segment is the oldest one opened and parsed.
    assert_latest_check_point(true, true, 6, 41, &tail);
}

#[test]
fn checkpoint_pointing_at_older_start_with_commit() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::StartAt("s"), Spec::Commit(123)]),
            segment(&[Spec::CheckPointAt("s")]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, 123, 42, &tail);
}

#[test]
fn checkpoint_pointing_at_older_start_without_commit() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::StartAt("s")]),
            segment(&[Spec::CheckPointAt("s")]),
        ],
    );

    let tail = scan(dir.path());

    // The Start sits exactly at the target and has no Commit; a started
    // and lost transaction still needs recovery's attention.
    assert_latest_check_point(true, true, NO_TRANSACTION_ID, 42, &tail);
}

#[test]
fn orphaned_start_between_checkpoint_and_older_target() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::Start, Spec::Commit(5), Spec::Position("p")]),
            segment(&[Spec::Start]),
            segment(&[Spec::CheckPointAt("p")]),
        ],
    );

    let tail = scan(dir.path());

    // The orphaned Start lives in a segment strictly between the
    // checkpoint's segment and the target's segment; only the forward
    // search from the target can see it.
    assert_latest_check_point(true, true, NO_TRANSACTION_ID, 41, &tail);
    assert!(tail.is_recovery_required());
}

#[test]
fn checkpoint_pointing_past_older_entries() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::Start, Spec::Commit(3), Spec::Position("end")]),
            segment(&[Spec::CheckPointAt("end")]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, false, NO_TRANSACTION_ID, 42, &tail);
}

#[test]
fn starts_before_and_after_checkpoint_in_older_segment() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[
                Spec::Start,
                Spec::Commit(1),
                Spec::CheckPointSelf,
                Spec::Start,
                Spec::Commit(432),
            ]),
            segment(&[]),
        ],
    );

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, 432, 42, &tail);
}

#[test]
fn truncated_tail_before_commit() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::CheckPointSelf]),
            segment(&[Spec::Start, Spec::Commit(2)]),
        ],
    );
    truncate_tail(dir.path(), END_VERSION, 3);

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, NO_TRANSACTION_ID, 42, &tail);
    assert!(tail.corrupt_tail_seen);
    assert!(tail.is_recovery_required());
}

#[test]
fn truncated_tail_after_first_commit() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::CheckPointSelf]),
            segment(&[Spec::Start, Spec::Commit(2), Spec::Start, Spec::Commit(3)]),
        ],
    );
    truncate_tail(dir.path(), END_VERSION, 3);

    let tail = scan(dir.path());

    assert_latest_check_point(true, true, 2, 42, &tail);
    assert!(tail.corrupt_tail_seen);
}

#[test]
fn corruption_only_adds_to_an_otherwise_equal_verdict() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[segment(&[Spec::Start, Spec::Commit(7), Spec::CheckPointSelf])],
    );

    let clean = scan(dir.path());
    assert!(!clean.corrupt_tail_seen);

    // A crash mid-write leaves garbage after the last durable entry.
    append_garbage(dir.path(), END_VERSION, &[0xEE, 0x00, 0xFF]);

    let dirty = scan(dir.path());
    assert!(dirty.corrupt_tail_seen);
    assert!(dirty.is_recovery_required());
    assert_eq!(clean.last_check_point, dirty.last_check_point);
    assert_eq!(
        clean.first_tx_id_after_last_check_point,
        dirty.first_tx_id_after_last_check_point
    );
    assert_eq!(
        clean.oldest_segment_version_found,
        dirty.oldest_segment_version_found
    );
}

#[test]
fn non_contiguous_segment_versions() {
    let dir = tempdir().unwrap();
    let files = LogFileSet::new(dir.path());

    {
        let mut writer = files.create(40, STORE_ID).unwrap();
        writer.start(0, 0, Vec::new()).unwrap();
        writer.commit(9, 0).unwrap();
    }
    drop(files.create(43, STORE_ID).unwrap());

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 9, 40, &tail);
    assert_eq!(tail.latest_segment_version, 43);
}

#[test]
fn headerless_segment_is_treated_as_absent() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        42,
        &[segment(&[Spec::Start, Spec::Commit(5)])],
    );
    fs::write(dir.path().join("wal.43"), b"not a segment at all").unwrap();

    let tail = scan(dir.path());

    assert_latest_check_point(false, true, 5, 42, &tail);
    assert!(!tail.corrupt_tail_seen);
    assert_eq!(tail.latest_segment_version, 43);
    assert_eq!(tail.store_id, STORE_ID);
}

#[test]
fn header_data_is_surfaced() {
    let dir = tempdir().unwrap();
    setup_log_files(dir.path(), END_VERSION, &[segment(&[])]);

    let tail = scan(dir.path());

    assert_eq!(tail.store_id, STORE_ID);
    assert_eq!(tail.latest_entry_format_version, LATEST_FORMAT_VERSION);
    assert_eq!(tail.latest_segment_version, 43);
}

#[test]
fn scanning_twice_yields_equal_verdicts() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::Start, Spec::Commit(1), Spec::CheckPointSelf]),
            segment(&[Spec::Start, Spec::Commit(2)]),
        ],
    );

    let scanner = TailScanner::new(LogFileSet::new(dir.path()));
    let first = scanner.scan_tail().unwrap();
    let second = scanner.scan_tail().unwrap();

    assert_eq!(first, second);
}

#[test]
fn monitor_observes_scan_events_in_order() {
    let dir = tempdir().unwrap();
    setup_log_files(
        dir.path(),
        END_VERSION,
        &[
            segment(&[Spec::CheckPointSelf]),
            segment(&[Spec::Start, Spec::Commit(2)]),
        ],
    );
    truncate_tail(dir.path(), END_VERSION, 3);

    let monitor = Arc::new(RecordingMonitor::default());
    let scanner = TailScanner::with_monitor(
        LogFileSet::new(dir.path()),
        Box::new(SharedMonitor(Arc::clone(&monitor))),
    );
    let tail = scanner.scan_tail().unwrap();

    let events = monitor.events.lock().unwrap().clone();

    // Backward walk opens 43 then 42; the corrupt tail of 43 is reported
    // in between; the extraction reopens 42 and 43; the verdict closes.
    assert_eq!(
        events[0],
        Event::SegmentOpened(43),
        "walk starts at the highest version"
    );
    assert!(events.contains(&Event::SegmentOpened(42)));
    let corrupted: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Corrupted(43, _)))
        .collect();
    assert_eq!(
        corrupted.len(),
        1,
        "the corrupt tail of 43 is hit by both passes but reported once"
    );
    assert_eq!(events.last().unwrap(), &Event::ScanComplete(Box::new(tail)));
}

// === Below is code for helping the tests above ===

/// One entry to write into a fixture segment.
#[derive(Debug, Clone, Copy)]
enum Spec {
    /// A Start entry.
    Start,
    /// A Start entry whose position is registered under a label.
    StartAt(&'static str),
    /// A Commit entry with the given transaction id.
    Commit(i64),
    /// A CheckPoint entry targeting its own position.
    CheckPointSelf,
    /// A CheckPoint entry targeting a previously registered position.
    CheckPointAt(&'static str),
    /// Registers the current position under a label, writes nothing.
    Position(&'static str),
}

fn segment(specs: &[Spec]) -> Vec<Spec> {
    specs.to_vec()
}

/// Writes fixture segments so that the last one gets version `end_version`,
/// mirroring how rotation assigns increasing versions. Returns every
/// position registered by [`Spec::StartAt`] and [`Spec::Position`].
fn setup_log_files(
    dir: &Path,
    end_version: u64,
    files: &[Vec<Spec>],
) -> HashMap<&'static str, LogPosition> {
    let set = LogFileSet::new(dir);
    let mut positions = HashMap::new();
    let mut version = end_version + 1 - files.len() as u64;

    for specs in files {
        let mut writer = set.create(version, STORE_ID).unwrap();
        for spec in specs {
            let current = writer.current_position().unwrap();
            match spec {
                Spec::Start => {
                    writer.start(0, 0, Vec::new()).unwrap();
                }
                Spec::StartAt(label) => {
                    positions.insert(*label, current);
                    writer.start(0, 0, Vec::new()).unwrap();
                }
                Spec::Commit(tx_id) => {
                    writer.commit(*tx_id, 0).unwrap();
                }
                Spec::CheckPointSelf => {
                    writer.check_point(current).unwrap();
                }
                Spec::CheckPointAt(label) => {
                    writer.check_point(positions[label]).unwrap();
                }
                Spec::Position(label) => {
                    positions.insert(*label, current);
                }
            }
        }
        writer.flush().unwrap();
        version += 1;
    }

    positions
}

fn scan(dir: &Path) -> TailInformation {
    TailScanner::new(LogFileSet::new(dir)).scan_tail().unwrap()
}

/// Simulates a crash that cut the end of a segment short.
fn truncate_tail(dir: &Path, version: u64, bytes: u64) {
    let path = dir.join(format!("wal.{version}"));
    let len = fs::metadata(&path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - bytes).unwrap();
}

/// Appends raw bytes, as a crash mid-frame would leave behind.
fn append_garbage(dir: &Path, version: u64, bytes: &[u8]) {
    use std::io::Write;
    let path = dir.join(format!("wal.{version}"));
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(bytes).unwrap();
}

fn assert_latest_check_point(
    has_check_point: bool,
    commits_after: bool,
    first_tx_id: i64,
    oldest_version: i64,
    tail: &TailInformation,
) {
    assert_eq!(has_check_point, tail.last_check_point.is_some());
    assert_eq!(commits_after, tail.commits_after_last_check_point);
    if commits_after {
        assert_eq!(first_tx_id, tail.first_tx_id_after_last_check_point);
    }
    assert_eq!(oldest_version, tail.oldest_segment_version_found);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    SegmentOpened(u64),
    Corrupted(u64, LogPosition),
    ScanComplete(Box<TailInformation>),
}

#[derive(Default)]
struct RecordingMonitor {
    events: std::sync::Mutex<Vec<Event>>,
}

impl TailScanMonitor for RecordingMonitor {
    fn on_segment_opened(&self, segment_version: u64) {
        self.events
            .lock()
            .unwrap()
            .push(Event::SegmentOpened(segment_version));
    }

    fn on_corrupted_log_file(&self, segment_version: u64, position: LogPosition, _reason: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Corrupted(segment_version, position));
    }

    fn on_scan_complete(&self, tail: &TailInformation) {
        self.events
            .lock()
            .unwrap()
            .push(Event::ScanComplete(Box::new(tail.clone())));
    }
}

struct SharedMonitor(Arc<RecordingMonitor>);

impl TailScanMonitor for SharedMonitor {
    fn on_segment_opened(&self, segment_version: u64) {
        self.0.on_segment_opened(segment_version);
    }

    fn on_corrupted_log_file(&self, segment_version: u64, position: LogPosition, reason: &str) {
        self.0
            .on_corrupted_log_file(segment_version, position, reason);
    }

    fn on_scan_complete(&self, tail: &TailInformation) {
        self.0.on_scan_complete(tail);
    }
}
