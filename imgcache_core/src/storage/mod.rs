//! Durable key-value storage for cache snapshots
//!
//! [`StorageBackend`] is the thin record store the platform provides
//! (string keys, string values, possibly size-limited per record).
//! [`PersistentStore`] builds the chunked snapshot format on top of it.

use crate::error::StorageError;
use async_trait::async_trait;

pub mod file;
pub mod memory;
pub mod snapshot;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use snapshot::{PersistentStore, SaveSummary};

/// Result type for backend operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Trait for record storage backends
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a record
    ///
    /// Returns `Ok(None)` when the record does not exist.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a record, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a record
    ///
    /// Removing a missing record is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}
