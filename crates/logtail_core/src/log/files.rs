//! Segment file enumeration and access.

use crate::error::{CoreError, CoreResult};
use crate::log::writer::LogWriter;
use crate::types::StoreId;
use logtail_storage::{Channel, FileChannel};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file-name prefix for log segments.
pub const DEFAULT_SEGMENT_PREFIX: &str = "wal";

/// The set of log segment files in a directory.
///
/// Segments are named `<prefix>.<version>` with the version in canonical
/// decimal form; files not matching the scheme are ignored. The set is
/// defined as "whatever exists on disk": every listing re-reads the
/// directory, and missing files are not errors.
///
/// The file set takes no locks. Exclusive access for the duration of a
/// tail scan is a lifecycle contract enforced by the recovery
/// collaborator.
///
/// # Example
///
/// ```no_run
/// use logtail_core::log::LogFileSet;
/// use std::path::Path;
///
/// # fn main() -> logtail_core::error::CoreResult<()> {
/// let files = LogFileSet::new(Path::new("data/txlogs"));
/// if let Some(version) = files.highest_version()? {
///     let channel = files.open(version)?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LogFileSet {
    dir: PathBuf,
    prefix: String,
}

impl LogFileSet {
    /// Creates a file set over `dir` with the default segment prefix.
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self::with_prefix(dir, DEFAULT_SEGMENT_PREFIX)
    }

    /// Creates a file set over `dir` with a custom segment prefix.
    #[must_use]
    pub fn with_prefix(dir: &Path, prefix: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    /// Returns the directory holding the segments.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the segment file-name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the path a segment of the given version lives at.
    #[must_use]
    pub fn path_for_version(&self, version: u64) -> PathBuf {
        self.dir.join(format!("{}.{}", self.prefix, version))
    }

    /// Lists the segment versions present on disk, sorted ascending.
    ///
    /// A directory that does not exist yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure other than the directory being
    /// absent.
    pub fn versions(&self) -> CoreResult<Vec<u64>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(version) = self.parse_version(name) {
                    versions.push(version);
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Returns whether any segment files exist.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn any_files(&self) -> CoreResult<bool> {
        Ok(!self.versions()?.is_empty())
    }

    /// Returns the highest segment version on disk, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn highest_version(&self) -> CoreResult<Option<u64>> {
        Ok(self.versions()?.last().copied())
    }

    /// Returns the lowest segment version on disk, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn lowest_version(&self) -> CoreResult<Option<u64>> {
        Ok(self.versions()?.first().copied())
    }

    /// Opens the segment of the given version for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(&self, version: u64) -> CoreResult<Box<dyn Channel>> {
        let channel = FileChannel::open_read_only(&self.path_for_version(version))?;
        Ok(Box::new(channel))
    }

    /// Returns the size of the segment of the given version in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    pub fn size(&self, version: u64) -> CoreResult<u64> {
        let metadata = fs::metadata(self.path_for_version(version))?;
        Ok(metadata.len())
    }

    /// Creates a new segment of the given version and returns a writer
    /// positioned after the freshly written header.
    ///
    /// Creates the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists already or cannot be created.
    pub fn create(&self, version: u64, store_id: StoreId) -> CoreResult<LogWriter> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for_version(version);
        if path.exists() {
            return Err(CoreError::invalid_argument(format!(
                "segment file already exists: {}",
                path.display()
            )));
        }

        let channel = FileChannel::open(&path)?;
        LogWriter::create(Box::new(channel), version, store_id)
    }

    /// Parses a segment version out of a file name.
    ///
    /// Only `<prefix>.<version>` with the version in canonical decimal form
    /// matches; anything else (wrong prefix, empty version, leading zeros,
    /// non-digits, overflow) is ignored.
    fn parse_version(&self, file_name: &str) -> Option<u64> {
        let rest = file_name.strip_prefix(&self.prefix)?.strip_prefix('.')?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if rest.len() > 1 && rest.starts_with('0') {
            return None;
        }
        rest.parse().ok()
    }
}
