//! Streaming entry reader for one log segment.

use crate::error::{CoreError, CoreResult};
use crate::log::entry::{compute_crc32c, EntryTag, LogEntry, CRC_SIZE, LATEST_FORMAT_VERSION, TAG_SIZE};
use crate::types::LogPosition;
use logtail_storage::Channel;

/// Read buffer size for streaming iteration.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of reading one entry.
///
/// End-of-segment and corruption are explicit values, not errors: the tail
/// scanner needs to distinguish "the log ends here cleanly" from "the log
/// ends here because a write was cut short", and neither aborts the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// An entry was decoded at the given position.
    Entry(LogPosition, LogEntry),
    /// EOF exactly at an entry boundary.
    CleanEnd,
    /// The bytes at `position` do not form a readable entry: unknown tag,
    /// checksum mismatch, or EOF mid-entry.
    Corrupt {
        /// Position where the unreadable entry begins.
        position: LogPosition,
        /// Human-readable description of what failed.
        reason: String,
    },
}

/// Latched terminal state of a reader.
#[derive(Debug, Clone)]
enum Terminal {
    CleanEnd,
    Corrupt { position: LogPosition, reason: String },
}

impl Terminal {
    fn to_outcome(&self) -> ReadOutcome {
        match self {
            Self::CleanEnd => ReadOutcome::CleanEnd,
            Self::Corrupt { position, reason } => ReadOutcome::Corrupt {
                position: *position,
                reason: reason.clone(),
            },
        }
    }
}

/// A streaming reader over the entries of one segment.
///
/// Reads entries one-by-one from a [`Channel`], keeping memory bounded
/// regardless of segment size. The reader is cheap to construct, owns its
/// channel (released when the reader is dropped), never buffers across
/// segment boundaries, and is not restartable: once it reports
/// [`ReadOutcome::CleanEnd`] or [`ReadOutcome::Corrupt`] every subsequent
/// call repeats that outcome.
///
/// # Errors
///
/// Only genuine I/O failures and an unsupported header format version
/// surface as `Err`; everything a crashed writer can leave behind is a
/// [`ReadOutcome::Corrupt`] value.
pub struct EntryReader {
    channel: Box<dyn Channel>,
    segment_version: u64,
    total_size: u64,
    /// File offset of the first unconsumed buffered byte.
    current_offset: u64,
    buffer: Vec<u8>,
    buffer_pos: usize,
    buffer_len: usize,
    terminal: Option<Terminal>,
}

impl EntryReader {
    /// Creates a reader positioned at `start_offset` within the segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel size cannot be determined.
    pub fn new(
        segment_version: u64,
        channel: Box<dyn Channel>,
        start_offset: u64,
    ) -> CoreResult<Self> {
        let total_size = channel.size()?;

        // A start offset past EOF means a stale or garbled position was
        // handed in; the first read reports it as corruption.
        let terminal = (start_offset > total_size).then(|| Terminal::Corrupt {
            position: LogPosition::new(segment_version, start_offset),
            reason: "position beyond end of segment".to_string(),
        });

        Ok(Self {
            channel,
            segment_version,
            total_size,
            current_offset: start_offset,
            buffer: vec![0u8; READ_BUFFER_SIZE],
            buffer_pos: 0,
            buffer_len: 0,
            terminal,
        })
    }

    /// The position the next entry would be read from.
    #[must_use]
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.segment_version, self.current_offset)
    }

    /// Reads the next entry.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or when a segment header declares a
    /// format version newer than [`LATEST_FORMAT_VERSION`].
    pub fn next_entry(&mut self) -> CoreResult<ReadOutcome> {
        if let Some(terminal) = &self.terminal {
            return Ok(terminal.to_outcome());
        }

        let position = LogPosition::new(self.segment_version, self.current_offset);

        if !self.ensure_buffered(TAG_SIZE)? {
            return Ok(self.finish_clean());
        }

        let tag_byte = self.buffer[self.buffer_pos];
        let Some(tag) = EntryTag::from_byte(tag_byte) else {
            return Ok(self.finish_corrupt(position, format!("unknown entry tag {tag_byte:#04x}")));
        };

        let fixed_len = tag.fixed_payload_len();
        if !self.ensure_buffered(TAG_SIZE + fixed_len)? {
            return Ok(self.finish_corrupt(position, "entry truncated mid-payload".to_string()));
        }

        let variable_len = match tag.variable_len_offset() {
            Some(offset) => self.peek_u32(TAG_SIZE + offset) as usize,
            None => 0,
        };

        let frame_len = TAG_SIZE + fixed_len + variable_len + CRC_SIZE;

        // Reject a declared length that overruns the segment before trying
        // to buffer it; garbage length fields must not grow the buffer.
        let remaining = self.total_size - position.byte_offset();
        if frame_len as u64 > remaining || !self.ensure_buffered(frame_len)? {
            return Ok(self.finish_corrupt(position, "entry truncated mid-payload".to_string()));
        }

        let frame_start = self.buffer_pos;
        let payload_start = frame_start + TAG_SIZE;
        let payload_end = payload_start + fixed_len + variable_len;

        let stored_crc = self.peek_u32(payload_end - frame_start);
        let computed_crc = compute_crc32c(&self.buffer[frame_start..payload_end]);
        if stored_crc != computed_crc {
            return Ok(self.finish_corrupt(
                position,
                format!("checksum mismatch: stored {stored_crc:08x}, computed {computed_crc:08x}"),
            ));
        }

        let entry = match LogEntry::decode_payload(tag, &self.buffer[payload_start..payload_end]) {
            Ok(entry) => entry,
            Err(error) => return Ok(self.finish_corrupt(position, error.to_string())),
        };

        if let LogEntry::Header { format_version, .. } = &entry {
            if *format_version > LATEST_FORMAT_VERSION {
                return Err(CoreError::unsupported_format(
                    *format_version,
                    self.segment_version,
                ));
            }
        }

        self.buffer_pos += frame_len;
        self.current_offset += frame_len as u64;

        Ok(ReadOutcome::Entry(position, entry))
    }

    fn finish_clean(&mut self) -> ReadOutcome {
        self.terminal = Some(Terminal::CleanEnd);
        ReadOutcome::CleanEnd
    }

    fn finish_corrupt(&mut self, position: LogPosition, reason: String) -> ReadOutcome {
        let terminal = Terminal::Corrupt { position, reason };
        let outcome = terminal.to_outcome();
        self.terminal = Some(terminal);
        outcome
    }

    /// Reads a big-endian `u32` at the given offset from the current
    /// buffer position. The bytes must already be buffered.
    fn peek_u32(&self, offset: usize) -> u32 {
        let at = self.buffer_pos + offset;
        u32::from_be_bytes([
            self.buffer[at],
            self.buffer[at + 1],
            self.buffer[at + 2],
            self.buffer[at + 3],
        ])
    }

    /// Ensures at least `min_bytes` are buffered from the current position.
    ///
    /// Returns `false` if the segment does not contain that many bytes
    /// beyond the current position. The buffer grows for entries larger
    /// than the default chunk size.
    fn ensure_buffered(&mut self, min_bytes: usize) -> CoreResult<bool> {
        let available = self.buffer_len - self.buffer_pos;
        if available >= min_bytes {
            return Ok(true);
        }

        let remaining = (self.total_size - self.current_offset) as usize;
        if remaining < min_bytes {
            return Ok(false);
        }

        // Move unconsumed data to the start of the buffer.
        if self.buffer_pos > 0 && available > 0 {
            self.buffer.copy_within(self.buffer_pos..self.buffer_len, 0);
        }
        self.buffer_len = available;
        self.buffer_pos = 0;

        if min_bytes > self.buffer.len() {
            self.buffer.resize(min_bytes.next_power_of_two(), 0);
        }

        let bytes_to_read =
            std::cmp::min(self.buffer.len() - self.buffer_len, remaining - available);

        if bytes_to_read > 0 {
            let read_offset = self.current_offset + self.buffer_len as u64;
            let data = self.channel.read_at(read_offset, bytes_to_read)?;
            self.buffer[self.buffer_len..self.buffer_len + data.len()].copy_from_slice(&data);
            self.buffer_len += data.len();
        }

        Ok(self.buffer_len - self.buffer_pos >= min_bytes)
    }
}

impl std::fmt::Debug for EntryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryReader")
            .field("segment_version", &self.segment_version)
            .field("current_offset", &self.current_offset)
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}
