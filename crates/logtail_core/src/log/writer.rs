//! Append-side writer for one log segment.

use crate::error::{CoreError, CoreResult};
use crate::log::entry::{
    compute_crc32c, LogEntry, BASE_CHECKSUM, CRC_SIZE, LATEST_FORMAT_VERSION, TAG_SIZE,
};
use crate::types::{LogPosition, StoreId};
use logtail_storage::Channel;

/// Appends framed entries to one segment channel.
///
/// The writer frames each entry as `tag | payload | crc32c`, writes the
/// segment [`LogEntry::Header`] on creation, and maintains the commit
/// checksum chain: every Start entry embeds the chain value of the
/// preceding Commit, and every Commit closes its transaction with a new
/// chain value.
///
/// The tail scanner never writes; this type exists for the log's append
/// path and for building segment fixtures in tests.
pub struct LogWriter {
    channel: Box<dyn Channel>,
    segment_version: u64,
    previous_checksum: u32,
}

impl LogWriter {
    /// Creates a writer over an empty channel and writes the segment header.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the channel is not empty, or an error
    /// if the header write fails.
    pub fn create(
        channel: Box<dyn Channel>,
        segment_version: u64,
        store_id: StoreId,
    ) -> CoreResult<Self> {
        if channel.size()? != 0 {
            return Err(CoreError::invalid_argument(
                "segment channel must be empty when creating a writer",
            ));
        }

        let mut writer = Self {
            channel,
            segment_version,
            previous_checksum: BASE_CHECKSUM,
        };
        writer.append(&LogEntry::Header {
            format_version: LATEST_FORMAT_VERSION,
            segment_version,
            store_id,
        })?;
        Ok(writer)
    }

    /// Appends a fully-formed entry.
    ///
    /// Returns the position where the entry begins.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the channel append fails.
    pub fn append(&mut self, entry: &LogEntry) -> CoreResult<LogPosition> {
        let payload = entry.encode_payload()?;

        let mut frame = Vec::with_capacity(TAG_SIZE + payload.len() + CRC_SIZE);
        frame.push(entry.tag().as_byte());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32c(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        let offset = self.channel.append(&frame)?;
        Ok(LogPosition::new(self.segment_version, offset))
    }

    /// Writes a Start entry carrying the current chain value.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn start(
        &mut self,
        time_written: i64,
        last_committed_tx: i64,
        additional: Vec<u8>,
    ) -> CoreResult<LogPosition> {
        self.append(&LogEntry::Start {
            previous_checksum: self.previous_checksum,
            time_written,
            last_committed_tx,
            additional,
        })
    }

    /// Writes a Commit entry, closing the transaction's checksum chain.
    ///
    /// Returns the entry position and the new chain value.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn commit(&mut self, tx_id: i64, time_committed: i64) -> CoreResult<(LogPosition, u32)> {
        let checksum = chain_checksum(self.previous_checksum, tx_id, time_committed);
        let position = self.append(&LogEntry::Commit {
            tx_id,
            time_committed,
            checksum,
        })?;
        self.previous_checksum = checksum;
        Ok((position, checksum))
    }

    /// Writes a CheckPoint entry pointing at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails.
    pub fn check_point(&mut self, target: LogPosition) -> CoreResult<LogPosition> {
        self.append(&LogEntry::CheckPoint { target })
    }

    /// Position where the next entry will be written.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel size cannot be determined.
    pub fn current_position(&self) -> CoreResult<LogPosition> {
        Ok(LogPosition::new(self.segment_version, self.channel.size()?))
    }

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.channel.flush()?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying channel.
    #[must_use]
    pub fn into_channel(self) -> Box<dyn Channel> {
        self.channel
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("segment_version", &self.segment_version)
            .finish_non_exhaustive()
    }
}

/// Chain value for a Commit entry: the previous value folded with the
/// commit's identity.
fn chain_checksum(previous: u32, tx_id: i64, time_committed: i64) -> u32 {
    let mut buf = [0u8; 20];
    buf[..4].copy_from_slice(&previous.to_be_bytes());
    buf[4..12].copy_from_slice(&tx_id.to_be_bytes());
    buf[12..20].copy_from_slice(&time_committed.to_be_bytes());
    compute_crc32c(&buf)
}
