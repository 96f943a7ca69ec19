//! Image Cache Core Library
//!
//! A TTL cache for image fetch results. It remembers which local assets and
//! remote URLs have been prefetched, survives restarts through a chunked
//! snapshot in a key-value store, and drives batch preloads with bounded
//! concurrency and progress reporting.

pub mod cache;
pub mod clock;
pub mod entry;
pub mod error;
pub mod events;
pub mod facade;
pub mod orchestrator;
pub mod prefetch;
pub mod profile;
pub mod progress;
pub mod registry;
pub mod report;
pub mod storage;

// Mock implementations and testing utilities live in the imgcache-test-utils crate

// Re-export main types
pub use cache::{CacheStats, ExpirySweeper, ImageCacheCore, InitState};
pub use clock::{Clock, SystemClock};
pub use entry::{AssetHandle, CACHE_TTL_MS, CacheEntry, ImageData, ImageSource};
pub use error::{Error, Result};
pub use events::{CacheEvent, EventSink, LogSink, NullSink, StorageOp};
pub use facade::{CacheUrlOptions, ImageCache, ImageCacheBuilder};
pub use orchestrator::BatchFetchOrchestrator;
pub use prefetch::{NoopPrefetcher, Prefetcher};
pub use profile::{PlatformProfile, ProfileKind};
pub use progress::{NullProvider, ProgressProvider, ProgressUpdate};
pub use registry::AssetRegistry;
pub use report::{CombinedReport, ItemFailure, PreloadReport};
pub use storage::{FileBackend, MemoryBackend, PersistentStore, StorageBackend};
