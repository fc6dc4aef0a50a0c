//! # logtail storage
//!
//! Byte channels for the logtail transaction-log crates.
//!
//! A [`Channel`] is an **opaque byte store** backing one log segment file.
//! Channels provide simple operations for reading at an offset, appending,
//! flushing and truncating. All log format interpretation lives in
//! `logtail_core` - channels do not understand entries, headers or
//! checksums.
//!
//! ## Design principles
//!
//! - Channels are simple byte stores (read, append, flush, truncate)
//! - No knowledge of the log entry format or segment layout
//! - Must be `Send + Sync` so a channel can be handed across threads
//!
//! ## Available channels
//!
//! - [`InMemoryChannel`] - for tests and ephemeral storage
//! - [`FileChannel`] - persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use logtail_storage::{Channel, InMemoryChannel};
//!
//! let mut channel = InMemoryChannel::new();
//! let offset = channel.append(b"hello world").unwrap();
//! let data = channel.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod error;
mod file;
mod memory;

pub use channel::Channel;
pub use error::{StorageError, StorageResult};
pub use file::FileChannel;
pub use memory::InMemoryChannel;
