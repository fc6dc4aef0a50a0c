//! Log entry types and payload serialization.

use crate::error::{CoreError, CoreResult};
use crate::types::{LogPosition, StoreId};

/// Newest log format version this build can read and write.
pub const LATEST_FORMAT_VERSION: u8 = 1;

/// Initial value of the commit checksum chain, used by the first Start
/// entry of a fresh log.
pub const BASE_CHECKSUM: u32 = 0;

/// Size of the tag byte that opens every entry frame.
pub(crate) const TAG_SIZE: usize = 1;

/// Size of the CRC32C trailer that closes every entry frame.
pub(crate) const CRC_SIZE: usize = 4;

/// Type of log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryTag {
    /// Segment header, once per segment at offset 0.
    Header = 1,
    /// Beginning of a transaction's record in the log.
    Start = 2,
    /// Successful completion of a transaction.
    Commit = 3,
    /// Durability marker pointing at a position at or before which the
    /// store state is persisted.
    CheckPoint = 4,
    /// Storage command payload, opaque to the tail scan.
    Command = 5,
    /// Transaction rollback marker.
    Rollback = 6,
}

impl EntryTag {
    /// Converts a byte to an entry tag.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Header),
            2 => Some(Self::Start),
            3 => Some(Self::Commit),
            4 => Some(Self::CheckPoint),
            5 => Some(Self::Command),
            6 => Some(Self::Rollback),
            _ => None,
        }
    }

    /// Converts the entry tag to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Fixed payload size in bytes.
    ///
    /// For tags with a variable part this includes the 4-byte length
    /// prefix but not the variable bytes themselves.
    #[must_use]
    pub(crate) const fn fixed_payload_len(self) -> usize {
        match self {
            // format_version (1) + segment_version (8) + store id (8 + 8)
            Self::Header => 25,
            // previous_checksum (4) + time_written (8) + last_committed_tx (8) + additional len (4)
            Self::Start => 24,
            // tx_id (8) + time_committed (8) + checksum (4)
            Self::Commit => 20,
            // target segment_version (8) + byte_offset (8)
            Self::CheckPoint => 16,
            // tx_id (8) + data len (4)
            Self::Command => 12,
            // tx_id (8) + time_written (8)
            Self::Rollback => 16,
        }
    }

    /// Offset within the payload of the `u32` length prefix for the
    /// variable part, if this tag has one.
    #[must_use]
    pub(crate) const fn variable_len_offset(self) -> Option<usize> {
        match self {
            Self::Start => Some(20),
            Self::Command => Some(8),
            _ => None,
        }
    }
}

/// A decoded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Segment header. Appears once per segment at offset 0; a segment
    /// without one is treated as absent.
    Header {
        /// Log format version of the entries that follow.
        format_version: u8,
        /// Version of the segment, equal to the version in the file name.
        segment_version: u64,
        /// Identity of the store this segment belongs to.
        store_id: StoreId,
    },

    /// Beginning of a transaction's record.
    Start {
        /// Checksum chain value of the previous transaction.
        previous_checksum: u32,
        /// Wall-clock time the entry was written, milliseconds since epoch.
        time_written: i64,
        /// Highest committed transaction id when the transaction started.
        last_committed_tx: i64,
        /// Opaque extra bytes supplied by the transaction originator.
        additional: Vec<u8>,
    },

    /// Successful completion of the transaction identified by `tx_id`.
    Commit {
        /// Id of the committed transaction. Strictly increasing across
        /// the whole log.
        tx_id: i64,
        /// Wall-clock time of the commit, milliseconds since epoch.
        time_committed: i64,
        /// Checksum chain value closing the transaction.
        checksum: u32,
    },

    /// Durability marker: the store is persisted up to `target`.
    CheckPoint {
        /// Position at or before which the store state is durable. Never
        /// points forward of the checkpoint entry itself.
        target: LogPosition,
    },

    /// Storage command record; payload is opaque to the tail scan.
    Command {
        /// Transaction the command belongs to.
        tx_id: i64,
        /// Serialized command bytes.
        data: Vec<u8>,
    },

    /// Rollback marker for the transaction identified by `tx_id`.
    Rollback {
        /// Transaction being rolled back.
        tx_id: i64,
        /// Wall-clock time the entry was written, milliseconds since epoch.
        time_written: i64,
    },
}

impl LogEntry {
    /// Maximum size for a variable-length payload field.
    ///
    /// The wire format carries variable parts behind a 4-byte length.
    pub const MAX_VARIABLE_SIZE: usize = u32::MAX as usize;

    /// Returns the entry tag.
    #[must_use]
    pub fn tag(&self) -> EntryTag {
        match self {
            Self::Header { .. } => EntryTag::Header,
            Self::Start { .. } => EntryTag::Start,
            Self::Commit { .. } => EntryTag::Commit,
            Self::CheckPoint { .. } => EntryTag::CheckPoint,
            Self::Command { .. } => EntryTag::Command,
            Self::Rollback { .. } => EntryTag::Rollback,
        }
    }

    /// Serializes the entry payload (without tag or checksum trailer).
    ///
    /// # Errors
    ///
    /// Returns an error if a variable-length field exceeds
    /// [`Self::MAX_VARIABLE_SIZE`].
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();

        match self {
            Self::Header {
                format_version,
                segment_version,
                store_id,
            } => {
                buf.push(*format_version);
                buf.extend_from_slice(&segment_version.to_be_bytes());
                buf.extend_from_slice(&store_id.creation_time().to_be_bytes());
                buf.extend_from_slice(&store_id.random_id().to_be_bytes());
            }

            Self::Start {
                previous_checksum,
                time_written,
                last_committed_tx,
                additional,
            } => {
                if additional.len() > Self::MAX_VARIABLE_SIZE {
                    return Err(CoreError::invalid_argument(format!(
                        "start entry additional data too large: {} bytes",
                        additional.len()
                    )));
                }
                buf.extend_from_slice(&previous_checksum.to_be_bytes());
                buf.extend_from_slice(&time_written.to_be_bytes());
                buf.extend_from_slice(&last_committed_tx.to_be_bytes());
                buf.extend_from_slice(&(additional.len() as u32).to_be_bytes());
                buf.extend_from_slice(additional);
            }

            Self::Commit {
                tx_id,
                time_committed,
                checksum,
            } => {
                buf.extend_from_slice(&tx_id.to_be_bytes());
                buf.extend_from_slice(&time_committed.to_be_bytes());
                buf.extend_from_slice(&checksum.to_be_bytes());
            }

            Self::CheckPoint { target } => {
                buf.extend_from_slice(&target.segment_version().to_be_bytes());
                buf.extend_from_slice(&target.byte_offset().to_be_bytes());
            }

            Self::Command { tx_id, data } => {
                if data.len() > Self::MAX_VARIABLE_SIZE {
                    return Err(CoreError::invalid_argument(format!(
                        "command entry data too large: {} bytes",
                        data.len()
                    )));
                }
                buf.extend_from_slice(&tx_id.to_be_bytes());
                buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
                buf.extend_from_slice(data);
            }

            Self::Rollback {
                tx_id,
                time_written,
            } => {
                buf.extend_from_slice(&tx_id.to_be_bytes());
                buf.extend_from_slice(&time_written.to_be_bytes());
            }
        }

        Ok(buf)
    }

    /// Deserializes an entry from its tag and payload.
    ///
    /// # Errors
    ///
    /// Returns a `LogCorruption` error if the payload is malformed. The
    /// entry reader maps such errors to its corruption outcome.
    pub fn decode_payload(tag: EntryTag, payload: &[u8]) -> CoreResult<Self> {
        let mut cursor = 0;

        let read_u32 = |cursor: &mut usize| -> CoreResult<u32> {
            if *cursor + 4 > payload.len() {
                return Err(CoreError::log_corruption("unexpected end of payload"));
            }
            let bytes: [u8; 4] = payload[*cursor..*cursor + 4]
                .try_into()
                .map_err(|_| CoreError::log_corruption("invalid u32"))?;
            *cursor += 4;
            Ok(u32::from_be_bytes(bytes))
        };

        let read_u64 = |cursor: &mut usize| -> CoreResult<u64> {
            if *cursor + 8 > payload.len() {
                return Err(CoreError::log_corruption("unexpected end of payload"));
            }
            let bytes: [u8; 8] = payload[*cursor..*cursor + 8]
                .try_into()
                .map_err(|_| CoreError::log_corruption("invalid u64"))?;
            *cursor += 8;
            Ok(u64::from_be_bytes(bytes))
        };

        let read_i64 = |cursor: &mut usize| -> CoreResult<i64> {
            if *cursor + 8 > payload.len() {
                return Err(CoreError::log_corruption("unexpected end of payload"));
            }
            let bytes: [u8; 8] = payload[*cursor..*cursor + 8]
                .try_into()
                .map_err(|_| CoreError::log_corruption("invalid i64"))?;
            *cursor += 8;
            Ok(i64::from_be_bytes(bytes))
        };

        let check_consumed = |cursor: usize| -> CoreResult<()> {
            if cursor != payload.len() {
                return Err(CoreError::log_corruption(format!(
                    "trailing bytes in {tag:?} entry: expected {} bytes, got {}",
                    cursor,
                    payload.len()
                )));
            }
            Ok(())
        };

        match tag {
            EntryTag::Header => {
                if payload.is_empty() {
                    return Err(CoreError::log_corruption("empty header payload"));
                }
                let format_version = payload[cursor];
                cursor += 1;
                let segment_version = read_u64(&mut cursor)?;
                let creation_time = read_i64(&mut cursor)?;
                let random_id = read_u64(&mut cursor)?;
                check_consumed(cursor)?;
                Ok(Self::Header {
                    format_version,
                    segment_version,
                    store_id: StoreId::new(creation_time, random_id),
                })
            }

            EntryTag::Start => {
                let previous_checksum = read_u32(&mut cursor)?;
                let time_written = read_i64(&mut cursor)?;
                let last_committed_tx = read_i64(&mut cursor)?;
                let len = read_u32(&mut cursor)? as usize;
                if cursor + len > payload.len() {
                    return Err(CoreError::log_corruption(
                        "unexpected end of additional data",
                    ));
                }
                let additional = payload[cursor..cursor + len].to_vec();
                cursor += len;
                check_consumed(cursor)?;
                Ok(Self::Start {
                    previous_checksum,
                    time_written,
                    last_committed_tx,
                    additional,
                })
            }

            EntryTag::Commit => {
                let tx_id = read_i64(&mut cursor)?;
                let time_committed = read_i64(&mut cursor)?;
                let checksum = read_u32(&mut cursor)?;
                check_consumed(cursor)?;
                Ok(Self::Commit {
                    tx_id,
                    time_committed,
                    checksum,
                })
            }

            EntryTag::CheckPoint => {
                let segment_version = read_u64(&mut cursor)?;
                let byte_offset = read_u64(&mut cursor)?;
                check_consumed(cursor)?;
                Ok(Self::CheckPoint {
                    target: LogPosition::new(segment_version, byte_offset),
                })
            }

            EntryTag::Command => {
                let tx_id = read_i64(&mut cursor)?;
                let len = read_u32(&mut cursor)? as usize;
                if cursor + len > payload.len() {
                    return Err(CoreError::log_corruption("unexpected end of command data"));
                }
                let data = payload[cursor..cursor + len].to_vec();
                cursor += len;
                check_consumed(cursor)?;
                Ok(Self::Command { tx_id, data })
            }

            EntryTag::Rollback => {
                let tx_id = read_i64(&mut cursor)?;
                let time_written = read_i64(&mut cursor)?;
                check_consumed(cursor)?;
                Ok(Self::Rollback {
                    tx_id,
                    time_written,
                })
            }
        }
    }
}

/// Computes a CRC32C (Castagnoli) checksum.
pub fn compute_crc32c(data: &[u8]) -> u32 {
    const CRC32C_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0x82F6_3B78;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32C_TABLE[index];
    }
    !crc
}
