//! In-memory channel for testing.

use crate::channel::Channel;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory channel.
///
/// Stores all data in a `Vec<u8>` and is suitable for unit tests and
/// ephemeral segment sets that never touch disk.
///
/// # Example
///
/// ```rust
/// use logtail_storage::{Channel, InMemoryChannel};
///
/// let mut channel = InMemoryChannel::new();
/// let offset = channel.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(channel.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryChannel {
    data: RwLock<Vec<u8>>,
}

impl InMemoryChannel {
    /// Creates a new empty in-memory channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory channel with pre-existing data.
    ///
    /// Useful for testing recovery scenarios from captured segment bytes.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of all data in the channel.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl Channel for InMemoryChannel {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let start = data.len().min(offset as usize);
        let end = data.len().min(start.saturating_add(len));
        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        if new_size > data.len() as u64 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cannot truncate past end",
            )));
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}
