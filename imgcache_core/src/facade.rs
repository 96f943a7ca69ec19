//! Public cache surface
//!
//! [`ImageCache`] bundles the core, the orchestrator and the asset registry
//! into the single service object collaborators talk to. Every operation
//! awaits the startup load first, so callers never see a half-restored map.

use crate::cache::{CacheStats, ExpirySweeper, ImageCacheCore, InitState};
use crate::clock::{Clock, SystemClock};
use crate::entry::ImageData;
use crate::error::{Error, Result};
use crate::events::{EventSink, LogSink};
use crate::orchestrator::BatchFetchOrchestrator;
use crate::prefetch::{NoopPrefetcher, Prefetcher};
use crate::profile::PlatformProfile;
use crate::progress::ProgressProvider;
use crate::registry::AssetRegistry;
use crate::report::{CombinedReport, PreloadReport};
use crate::storage::{MemoryBackend, PersistentStore, StorageBackend};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Options for [`ImageCache::cache_image_url`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUrlOptions {
    /// Fetch again even when a valid entry exists
    pub force_refresh: bool,
    /// Give up after this long; the call then returns `false`
    pub timeout: Option<Duration>,
}

/// The image cache service
///
/// Build one per process with [`ImageCache::builder`] and share it.
pub struct ImageCache {
    core: Arc<ImageCacheCore>,
    orchestrator: BatchFetchOrchestrator,
    registry: Arc<AssetRegistry>,
}

impl ImageCache {
    pub fn builder() -> ImageCacheBuilder {
        ImageCacheBuilder::default()
    }

    /// Wait until the persisted snapshot has been restored
    pub async fn wait_for_init(&self) {
        self.core.initialize().await;
    }

    pub fn state(&self) -> InitState {
        self.core.state()
    }

    /// Make sure `url` is fetched and cached
    ///
    /// Returns `true` when the URL is cached afterwards, including when it
    /// already was. Invalid URLs, fetch failures and timeouts return `false`.
    pub async fn cache_image_url(&self, url: &str, options: CacheUrlOptions) -> bool {
        self.wait_for_init().await;

        let attempt = self.orchestrator.cache_remote(url, options.force_refresh);
        let result = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .unwrap_or_else(|_| {
                    Err(Error::timeout("Image caching", limit.as_millis() as u64))
                }),
            None => attempt.await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to cache image URL '{url}': {e}");
                false
            }
        }
    }

    /// Cache many URLs with the profile's default batching
    pub async fn cache_image_urls(
        &self,
        urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.wait_for_init().await;
        self.orchestrator.preload_remote(urls, progress).await
    }

    /// Cache many URLs in batches of `batch_size`
    pub async fn batch_cache(
        &self,
        urls: &[String],
        batch_size: usize,
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.wait_for_init().await;
        self.orchestrator
            .batch_cache(urls, batch_size, progress)
            .await
    }

    /// Cache URLs a screen cannot render without
    pub async fn preload_critical(
        &self,
        urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        debug!("Preloading {} critical images", urls.len());
        self.cache_image_urls(urls, progress).await
    }

    pub async fn is_image_cached(&self, key: &str) -> bool {
        self.wait_for_init().await;
        self.core.has(key).await
    }

    pub async fn get_cached_image(&self, key: &str) -> Option<ImageData> {
        self.wait_for_init().await;
        self.core.get(key).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.wait_for_init().await;
        self.core.stats().await
    }

    /// Remove everything, in memory and on disk
    pub async fn clear_image_cache(&self) {
        self.wait_for_init().await;
        self.core.clear_all().await;
    }

    /// Remove expired entries, returning how many were removed
    pub async fn clear_expired_cache(&self) -> usize {
        self.wait_for_init().await;
        self.core.evict_expired().await
    }

    /// Preload bundled assets; `None` preloads every registered key
    pub async fn preload_local_images(
        &self,
        keys: Option<&[String]>,
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.wait_for_init().await;
        match keys {
            Some(keys) => self.orchestrator.preload_local(keys, progress).await,
            None => {
                let keys = self.registry.keys();
                self.orchestrator.preload_local(&keys, progress).await
            }
        }
    }

    pub async fn preload_remote_images(
        &self,
        urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.cache_image_urls(urls, progress).await
    }

    /// Local assets first, then remote URLs
    pub async fn preload_all_images(
        &self,
        local_keys: &[String],
        remote_urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<CombinedReport> {
        self.wait_for_init().await;
        self.orchestrator
            .preload_all(local_keys, remote_urls, progress)
            .await
    }

    /// Local preload bounded by `limit`
    ///
    /// On timeout the error is returned and whatever was cached so far stays.
    pub async fn preload_images_with_timeout(
        &self,
        keys: &[String],
        limit: Duration,
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.wait_for_init().await;
        self.orchestrator
            .preload_with_timeout(keys, limit, progress)
            .await
    }

    /// Persist the current contents now
    pub async fn flush(&self) {
        self.wait_for_init().await;
        self.core.flush().await;
    }

    /// Start the periodic expiry sweep; it stops when the handle is dropped
    pub fn spawn_expiry_sweeper(&self) -> ExpirySweeper {
        self.core.spawn_expiry_sweeper()
    }

    pub fn core(&self) -> &Arc<ImageCacheCore> {
        &self.core
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }
}

/// Builder for [`ImageCache`]
///
/// Everything is optional: the defaults are an in-memory backend, a
/// prefetcher that accepts every source, an empty registry, the standard
/// profile, the system clock and a sink that logs.
#[derive(Default)]
pub struct ImageCacheBuilder {
    backend: Option<Arc<dyn StorageBackend>>,
    prefetcher: Option<Arc<dyn Prefetcher>>,
    registry: AssetRegistry,
    profile: PlatformProfile,
    clock: Option<Arc<dyn Clock>>,
    events: Option<Arc<dyn EventSink>>,
    prefix: Option<String>,
}

impl ImageCacheBuilder {
    pub fn storage(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn prefetcher(mut self, prefetcher: Arc<dyn Prefetcher>) -> Self {
        self.prefetcher = Some(prefetcher);
        self
    }

    pub fn registry(mut self, registry: AssetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn profile(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Record key prefix for the persisted snapshot
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Build the cache
    ///
    /// Must be called inside a Tokio runtime. The startup load does not begin
    /// until the first operation or [`ImageCache::wait_for_init`].
    pub fn build(self) -> Result<ImageCache> {
        self.profile.validate()?;

        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let prefetcher = self.prefetcher.unwrap_or_else(|| Arc::new(NoopPrefetcher));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let events = self.events.unwrap_or_else(|| Arc::new(LogSink));

        let mut store = PersistentStore::new(
            backend,
            self.profile.chunk_size,
            Arc::clone(&clock),
            Arc::clone(&events),
        );
        if let Some(prefix) = self.prefix {
            store = store.with_prefix(prefix);
        }

        let core = Arc::new(ImageCacheCore::new(store, self.profile, clock, events));
        let registry = Arc::new(self.registry);
        let orchestrator =
            BatchFetchOrchestrator::new(Arc::clone(&core), Arc::clone(&registry), prefetcher);

        Ok(ImageCache {
            core,
            orchestrator,
            registry,
        })
    }
}
