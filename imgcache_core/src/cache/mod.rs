//! In-memory TTL cache with write-behind persistence
//!
//! [`ImageCacheCore`] owns the authoritative map. Mutations are mirrored to
//! the [`PersistentStore`](crate::storage::PersistentStore) by a background
//! write-behind task that coalesces bursts into a single snapshot save.

mod core;
mod sweeper;
mod write_behind;

pub use self::core::ImageCacheCore;
pub use self::sweeper::ExpirySweeper;

use serde::Serialize;

/// Lifecycle of the startup load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No load has been started
    Uninitialized,
    /// The single store load is in flight
    Initializing,
    /// Load finished (successfully or not); the cache is usable
    Ready,
}

/// Snapshot of cache health, computed by scanning the live map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub valid_keys: Vec<String>,
    pub expired_keys: Vec<String>,
}
