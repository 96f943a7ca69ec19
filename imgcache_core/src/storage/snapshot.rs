//! Chunked snapshot persistence
//!
//! A snapshot is written as a series of chunk records plus one metadata
//! record. The metadata is removed before the chunks are rewritten and only
//! written back once every chunk is in place, so an interrupted save leaves
//! no metadata and the next load ignores the partial chunks.
//!
//! Record layout, for a prefix `p`:
//! - `p:meta`    `{ version, generation, chunk_count, entry_count, saved_at }`
//! - `p:chunk:N` `{ generation, entries: [[key, entry], ...] }`
//!
//! Every chunk carries the generation of the save that wrote it; a chunk
//! whose generation does not match the metadata is a leftover from another
//! save and invalidates the load.

use crate::clock::Clock;
use crate::entry::CacheEntry;
use crate::error::StorageError;
use crate::events::{CacheEvent, EventSink, StorageOp};
use crate::storage::{StorageBackend, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Record key prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "image_cache";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    version: u32,
    generation: u64,
    chunk_count: usize,
    entry_count: usize,
    saved_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotChunk {
    generation: u64,
    entries: Vec<(String, CacheEntry)>,
}

/// Outcome of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub entries: usize,
    pub chunks: usize,
}

/// Durable mirror of the cache contents
pub struct PersistentStore {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
    chunk_size: usize,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl PersistentStore {
    /// Create a store writing `chunk_size` entries per chunk record
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        chunk_size: usize,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            backend,
            prefix: DEFAULT_PREFIX.to_string(),
            chunk_size: chunk_size.max(1),
            clock,
            events,
        }
    }

    /// Use a different record key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn meta_key(&self) -> String {
        format!("{}:meta", self.prefix)
    }

    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}:chunk:{index}", self.prefix)
    }

    /// Load every persisted entry
    ///
    /// Never fails: a missing snapshot, a backend error or any inconsistency
    /// yields an empty list. Failures are logged and reported as events.
    pub async fn load(&self) -> Vec<(String, CacheEntry)> {
        match self.try_load().await {
            Ok(entries) => entries,
            Err(e) => {
                self.events.emit(CacheEvent::StorageFailed {
                    op: StorageOp::Load,
                    error: e,
                });
                Vec::new()
            }
        }
    }

    /// Load every persisted entry, surfacing the first failure
    pub async fn try_load(&self) -> StorageResult<Vec<(String, CacheEntry)>> {
        let Some(meta) = self.read_meta().await? else {
            return Ok(Vec::new());
        };

        let meta_key = self.meta_key();
        if meta.version != SNAPSHOT_VERSION {
            return Err(StorageError::corrupt(
                &meta_key,
                format!("unsupported snapshot version {}", meta.version),
            ));
        }

        let mut entries = Vec::with_capacity(meta.entry_count);
        for index in 0..meta.chunk_count {
            let key = self.chunk_key(index);
            let raw = self
                .backend
                .get(&key)
                .await?
                .ok_or_else(|| StorageError::corrupt(&key, "chunk missing"))?;
            let chunk: SnapshotChunk = serde_json::from_str(&raw)
                .map_err(|e| StorageError::corrupt(&key, e.to_string()))?;

            if chunk.generation != meta.generation {
                return Err(StorageError::corrupt(
                    &key,
                    format!(
                        "chunk generation {} does not match snapshot generation {}",
                        chunk.generation, meta.generation
                    ),
                ));
            }
            entries.extend(chunk.entries);
        }

        if entries.len() != meta.entry_count {
            return Err(StorageError::corrupt(
                &meta_key,
                format!(
                    "expected {} entries, found {}",
                    meta.entry_count,
                    entries.len()
                ),
            ));
        }

        Ok(entries)
    }

    /// Persist a full snapshot
    ///
    /// Never fails outward; failures are logged and reported as events.
    pub async fn save(&self, entries: &[(String, CacheEntry)]) {
        match self.try_save(entries).await {
            Ok(summary) => self.events.emit(CacheEvent::SnapshotSaved {
                entries: summary.entries,
                chunks: summary.chunks,
            }),
            Err(e) => self.events.emit(CacheEvent::StorageFailed {
                op: StorageOp::Save,
                error: e,
            }),
        }
    }

    /// Persist a full snapshot, surfacing the first failure
    pub async fn try_save(&self, entries: &[(String, CacheEntry)]) -> StorageResult<SaveSummary> {
        // An unreadable previous snapshot only costs us the generation counter
        let previous = self.read_meta().await.ok().flatten();
        let now = self.clock.now_millis();
        let generation = match previous {
            Some(meta) => meta.generation.wrapping_add(1),
            None => now.max(0) as u64,
        };

        let meta_key = self.meta_key();
        self.backend.remove(&meta_key).await?;

        let mut chunk_count = 0;
        for (index, slice) in entries.chunks(self.chunk_size).enumerate() {
            let chunk = SnapshotChunk {
                generation,
                entries: slice.to_vec(),
            };
            let raw = serde_json::to_string(&chunk)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            self.backend.set(&self.chunk_key(index), &raw).await?;
            chunk_count = index + 1;
        }

        let meta = SnapshotMeta {
            version: SNAPSHOT_VERSION,
            generation,
            chunk_count,
            entry_count: entries.len(),
            saved_at: now,
        };
        let raw =
            serde_json::to_string(&meta).map_err(|e| StorageError::serialization(e.to_string()))?;
        self.backend.set(&meta_key, &raw).await?;

        // The snapshot is committed; leftovers are unreachable, so failing to
        // remove them is not a save failure.
        if let Err(e) = self.remove_chunks_from(chunk_count).await {
            log::debug!("Failed to remove stale snapshot chunks: {e}");
        }

        Ok(SaveSummary {
            entries: entries.len(),
            chunks: chunk_count,
        })
    }

    /// Remove the snapshot entirely
    pub async fn clear(&self) {
        let result = async {
            self.backend.remove(&self.meta_key()).await?;
            self.remove_chunks_from(0).await
        }
        .await;

        if let Err(e) = result {
            self.events.emit(CacheEvent::StorageFailed {
                op: StorageOp::Clear,
                error: e,
            });
        }
    }

    async fn read_meta(&self) -> StorageResult<Option<SnapshotMeta>> {
        let key = self.meta_key();
        match self.backend.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::corrupt(&key, e.to_string())),
            None => Ok(None),
        }
    }

    /// Remove consecutive chunk records starting at `first`
    ///
    /// Chunks are always written densely from index 0, so the first missing
    /// index marks the end of any leftovers.
    async fn remove_chunks_from(&self, first: usize) -> StorageResult<()> {
        let mut index = first;
        loop {
            let key = self.chunk_key(index);
            if self.backend.get(&key).await?.is_none() {
                return Ok(());
            }
            self.backend.remove(&key).await?;
            index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::entry::ImageData;
    use crate::events::NullSink;
    use crate::storage::MemoryBackend;
    use std::sync::Mutex;

    struct CollectingSink(Mutex<Vec<CacheEvent>>);

    impl EventSink for CollectingSink {
        fn emit(&self, event: CacheEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn entries(n: usize) -> Vec<(String, CacheEntry)> {
        (0..n)
            .map(|i| {
                let url = format!("https://img.example/{i}.png");
                (
                    url.clone(),
                    CacheEntry::with_timestamp(ImageData::remote(url), 1_000 + i as i64),
                )
            })
            .collect()
    }

    fn store(backend: &MemoryBackend, chunk_size: usize) -> PersistentStore {
        PersistentStore::new(
            Arc::new(backend.clone()),
            chunk_size,
            Arc::new(SystemClock),
            Arc::new(NullSink),
        )
    }

    #[tokio::test]
    async fn test_load_without_snapshot_is_empty() {
        let backend = MemoryBackend::new();
        assert!(store(&backend, 10).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_chunked_roundtrip() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 3);
        let original = entries(10);

        let summary = store.try_save(&original).await.unwrap();
        assert_eq!(summary, SaveSummary { entries: 10, chunks: 4 });
        assert_eq!(backend.len().await, 5);

        assert_eq!(store.load().await, original);
    }

    #[tokio::test]
    async fn test_empty_snapshot_roundtrip() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 3);
        store.try_save(&entries(5)).await.unwrap();

        let summary = store.try_save(&[]).await.unwrap();
        assert_eq!(summary.chunks, 0);
        assert!(store.load().await.is_empty());
        // Only the metadata record remains
        assert_eq!(backend.keys().await, vec![store.meta_key()]);
    }

    #[tokio::test]
    async fn test_shrinking_snapshot_removes_stale_chunks() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 2);

        store.try_save(&entries(7)).await.unwrap();
        assert!(backend.get(&store.chunk_key(3)).await.unwrap().is_some());

        store.try_save(&entries(3)).await.unwrap();
        assert!(backend.get(&store.chunk_key(2)).await.unwrap().is_none());
        assert!(backend.get(&store.chunk_key(3)).await.unwrap().is_none());
        assert_eq!(store.load().await, entries(3));
    }

    #[tokio::test]
    async fn test_missing_meta_ignores_chunks() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 2);
        store.try_save(&entries(5)).await.unwrap();

        backend.remove(&store.meta_key()).await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_meta_is_empty_and_reported() {
        let backend = MemoryBackend::new();
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let store = PersistentStore::new(
            Arc::new(backend.clone()),
            2,
            Arc::new(SystemClock),
            sink.clone(),
        );
        store.try_save(&entries(5)).await.unwrap();

        let raw = backend.get(&store.meta_key()).await.unwrap().unwrap();
        backend
            .set(&store.meta_key(), &raw[..raw.len() / 2])
            .await
            .unwrap();

        assert!(store.load().await.is_empty());
        let events = sink.0.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some(CacheEvent::StorageFailed {
                op: StorageOp::Load,
                error: StorageError::Corrupt { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_generation_mismatch_is_empty() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 2);
        store.try_save(&entries(4)).await.unwrap();
        let old_chunk = backend.get(&store.chunk_key(1)).await.unwrap().unwrap();

        store.try_save(&entries(4)).await.unwrap();
        // Simulate a chunk left behind by an earlier save
        backend.set(&store.chunk_key(1), &old_chunk).await.unwrap();

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_chunk_is_empty() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 2);
        store.try_save(&entries(6)).await.unwrap();
        backend.remove(&store.chunk_key(1)).await.unwrap();

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_limit_failure_is_swallowed() {
        let backend = MemoryBackend::with_record_limit(64);
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let store = PersistentStore::new(
            Arc::new(backend.clone()),
            50,
            Arc::new(SystemClock),
            sink.clone(),
        );

        store.save(&entries(10)).await;

        assert!(store.load().await.is_empty());
        let events = sink.0.lock().unwrap();
        assert!(matches!(
            events.first(),
            Some(CacheEvent::StorageFailed {
                op: StorageOp::Save,
                error: StorageError::RecordTooLarge { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let backend = MemoryBackend::new();
        let store = store(&backend, 2).with_prefix("thumbs");
        store.try_save(&entries(5)).await.unwrap();
        assert!(backend.keys().await.iter().all(|k| k.starts_with("thumbs:")));

        store.clear().await;
        assert!(backend.is_empty().await);
        assert!(store.load().await.is_empty());
    }
}
