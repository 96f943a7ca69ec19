//! Cache lifecycle events
//!
//! Storage failures are swallowed so the cache keeps working in memory.
//! They still go somewhere: every degraded-mode decision is reported to an
//! [`EventSink`], which by default forwards to the `log` facade.

use crate::error::StorageError;

/// Which persistence operation an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Load,
    Save,
    Clear,
}

/// Something the cache did that callers may want to observe
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// Startup load finished
    SnapshotLoaded { restored: usize, dropped_expired: usize },
    /// A snapshot was written
    SnapshotSaved { entries: usize, chunks: usize },
    /// A persistence operation failed and was swallowed
    StorageFailed { op: StorageOp, error: StorageError },
    /// A write arrived before initialization finished and was queued
    WriteQueued { key: String },
    /// Expired entries were removed
    ExpiredEvicted { count: usize },
}

/// Receiver for cache events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CacheEvent);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: CacheEvent) {
        match event {
            CacheEvent::SnapshotLoaded {
                restored,
                dropped_expired,
            } => {
                log::debug!(
                    "Image cache restored {restored} entries ({dropped_expired} expired dropped)"
                );
            }
            CacheEvent::SnapshotSaved { entries, chunks } => {
                log::debug!("Image cache saved {entries} entries in {chunks} chunk(s)");
            }
            CacheEvent::StorageFailed { op, error } => {
                log::warn!("Image cache storage {op:?} failed, continuing in memory: {error}");
            }
            CacheEvent::WriteQueued { key } => {
                log::debug!("Cache not ready, queued write for {key}");
            }
            CacheEvent::ExpiredEvicted { count } => {
                log::debug!("Evicted {count} expired image cache entries");
            }
        }
    }
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: CacheEvent) {
        // No-op
    }
}
