//! Channel trait definition.

use crate::error::StorageResult;

/// A byte channel backing one log segment file.
///
/// Channels are **opaque byte stores**. They provide simple operations for
/// reading, appending and flushing data. The log crates own all format
/// interpretation - channels do not understand entries or headers.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` ensures all appended data is durable
/// - EOF is observable: a read reaching past the current size returns the
///   bytes that exist, so partial reads at EOF surface as exact byte
///   counts
/// - Channels must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryChannel`] - for testing
/// - [`super::FileChannel`] - for persistent storage
pub trait Channel: Send + Sync {
    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes when the read reaches EOF, and an empty vector
    /// when `offset` is at or beyond the current size.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the channel.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the channel in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush`: file metadata (size, timestamps)
    /// is also durable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Truncates the channel to the given size.
    ///
    /// Removes all data after the specified offset. The tail scanner never
    /// truncates; the test suite uses this to simulate crashes that cut a
    /// segment mid-entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The truncation fails
    /// - `new_size` is greater than the current size
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
