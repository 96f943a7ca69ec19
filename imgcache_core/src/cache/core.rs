//! Authoritative in-memory cache

use crate::cache::sweeper::ExpirySweeper;
use crate::cache::write_behind::WriteBehind;
use crate::cache::{CacheStats, InitState};
use crate::clock::Clock;
use crate::entry::{CacheEntry, ImageData};
use crate::events::{CacheEvent, EventSink};
use crate::profile::PlatformProfile;
use crate::storage::PersistentStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{OnceCell, RwLock};

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Map state shared with the write-behind task
///
/// `ready` lives under the same lock as the map so a write racing the end of
/// the startup load is either queued and replayed, or applied directly.
#[derive(Default)]
pub(crate) struct CacheMap {
    entries: HashMap<String, CacheEntry>,
    queued: Vec<(String, CacheEntry)>,
    ready: bool,
}

impl CacheMap {
    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    /// Every entry, sorted by key
    pub(crate) fn snapshot(&self) -> Vec<(String, CacheEntry)> {
        let mut entries: Vec<(String, CacheEntry)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// In-memory TTL cache restored from, and mirrored to, a persistent store
///
/// Construct once per process and share through an `Arc`. Construction
/// spawns the write-behind task, so it must happen inside a Tokio runtime.
pub struct ImageCacheCore {
    map: Arc<RwLock<CacheMap>>,
    store: Arc<PersistentStore>,
    writer: WriteBehind,
    init: OnceCell<()>,
    phase: AtomicU8,
    profile: PlatformProfile,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl ImageCacheCore {
    pub fn new(
        store: PersistentStore,
        profile: PlatformProfile,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let map = Arc::new(RwLock::new(CacheMap::default()));
        let store = Arc::new(store);
        let writer = WriteBehind::spawn(
            Arc::clone(&map),
            Arc::clone(&store),
            profile.debounce_window(),
            profile.flush_threshold,
        );

        Self {
            map,
            store,
            writer,
            init: OnceCell::new(),
            phase: AtomicU8::new(UNINITIALIZED),
            profile,
            clock,
            events,
        }
    }

    pub fn state(&self) -> InitState {
        match self.phase.load(Ordering::Acquire) {
            READY => InitState::Ready,
            INITIALIZING => InitState::Initializing,
            _ => InitState::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == InitState::Ready
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Load the persisted snapshot, once
    ///
    /// Concurrent callers share the single in-flight load. Always ends in
    /// [`InitState::Ready`]; a failed load leaves the cache empty.
    pub async fn initialize(&self) {
        self.init.get_or_init(|| self.restore()).await;
    }

    async fn restore(&self) {
        self.phase.store(INITIALIZING, Ordering::Release);

        let loaded = self.store.load().await;
        let now = self.clock.now_millis();
        let total = loaded.len();
        let fresh: Vec<(String, CacheEntry)> = loaded
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .collect();
        let restored = fresh.len();
        let dropped_expired = total - restored;

        let batch_size = self.profile.load_batch_size.max(1);
        let mut fresh = fresh.into_iter();
        loop {
            let batch: Vec<(String, CacheEntry)> = fresh.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            self.map.write().await.entries.extend(batch);

            if self.profile.cooperative_yield {
                tokio::task::yield_now().await;
            }
        }

        let replayed = {
            let mut map = self.map.write().await;
            let queued = std::mem::take(&mut map.queued);
            let replayed = queued.len();
            // Writes issued during startup are newer than anything on disk
            map.entries.extend(queued);
            map.ready = true;
            replayed
        };
        self.phase.store(READY, Ordering::Release);

        self.events.emit(CacheEvent::SnapshotLoaded {
            restored,
            dropped_expired,
        });
        if replayed > 0 || dropped_expired > 0 {
            self.writer.mark_dirty();
        }
    }

    /// Cached data for `key`
    ///
    /// Expired entries are evicted and reported as absent. Before the cache
    /// is ready every key is absent.
    pub async fn get(&self, key: &str) -> Option<ImageData> {
        let now = self.clock.now_millis();
        let mut map = self.map.write().await;
        if !map.ready {
            return None;
        }

        let entry = map.entries.get(key)?;
        if !entry.is_expired_at(now) {
            return Some(entry.data().clone());
        }

        map.entries.remove(key);
        drop(map);
        self.events.emit(CacheEvent::ExpiredEvicted { count: 1 });
        self.writer.mark_dirty();
        None
    }

    /// Whether `key` holds a valid entry, with the same eviction as [`get`](Self::get)
    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Insert or replace the entry for `key`, stamped now
    ///
    /// Before the cache is ready the write is queued and applied once the
    /// startup load finishes.
    pub async fn put(&self, key: impl Into<String>, data: ImageData) {
        let key = key.into();
        let entry = CacheEntry::with_timestamp(data, self.clock.now_millis());

        let mut map = self.map.write().await;
        if !map.ready {
            map.queued.push((key.clone(), entry));
            drop(map);
            self.events.emit(CacheEvent::WriteQueued { key });
            return;
        }

        map.entries.insert(key, entry);
        drop(map);
        self.writer.mark_dirty();
    }

    /// Remove every expired entry, returning how many were removed
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let removed = {
            let mut map = self.map.write().await;
            if !map.ready {
                return 0;
            }
            let before = map.entries.len();
            map.entries.retain(|_, entry| !entry.is_expired_at(now));
            before - map.entries.len()
        };

        if removed > 0 {
            self.events
                .emit(CacheEvent::ExpiredEvicted { count: removed });
            self.writer.mark_dirty();
        }
        removed
    }

    /// Empty the cache and wait until the empty state is persisted
    pub async fn clear_all(&self) {
        // Clearing before the load would let the load resurrect old entries
        self.initialize().await;

        {
            let mut map = self.map.write().await;
            map.entries.clear();
            map.queued.clear();
        }
        self.writer.flush().await;
    }

    /// Save the current contents now and wait for the save to finish
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Count valid and expired entries without evicting anything
    pub async fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let map = self.map.read().await;

        let mut valid_keys = Vec::new();
        let mut expired_keys = Vec::new();
        for (key, entry) in &map.entries {
            if entry.is_expired_at(now) {
                expired_keys.push(key.clone());
            } else {
                valid_keys.push(key.clone());
            }
        }
        valid_keys.sort();
        expired_keys.sort();

        CacheStats {
            total: map.entries.len(),
            valid: valid_keys.len(),
            expired: expired_keys.len(),
            valid_keys,
            expired_keys,
        }
    }

    /// Number of entries in the map, expired ones included
    pub async fn len(&self) -> usize {
        self.map.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.read().await.entries.is_empty()
    }

    /// Every key in the map, expired ones included, sorted
    pub async fn keys(&self) -> Vec<String> {
        let map = self.map.read().await;
        let mut keys: Vec<String> = map.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Start evicting expired entries every `profile.sweep_interval`
    pub fn spawn_expiry_sweeper(self: &Arc<Self>) -> ExpirySweeper {
        ExpirySweeper::spawn(self, self.profile.sweep_interval())
    }
}
