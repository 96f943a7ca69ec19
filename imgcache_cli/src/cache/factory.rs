//! Builds the image cache a command runs against
//!
//! The storage backend, prefetcher, profile and asset registry all come from
//! the loaded [`AppConfig`].

use crate::config::{AppConfig, StorageKind};
use crate::prefetch::HttpPrefetcher;
use anyhow::{Context, Result};
use imgcache_core::{FileBackend, ImageCache, LogSink, MemoryBackend, StorageBackend};
use log::debug;
use std::sync::Arc;

/// Factory for creating [`ImageCache`] instances
pub struct CacheFactory;

impl CacheFactory {
    /// Create the cache described by `config`
    ///
    /// Must be called inside a Tokio runtime.
    pub fn create(config: &AppConfig) -> Result<ImageCache> {
        let backend = Self::backend(config)?;
        let prefetcher =
            HttpPrefetcher::from_config(config).context("Failed to create HTTP client")?;

        let cache = ImageCache::builder()
            .storage(backend)
            .prefetcher(Arc::new(prefetcher))
            .registry(config.registry())
            .profile(config.profile())
            .events(Arc::new(LogSink))
            .key_prefix(config.cache.key_prefix.clone())
            .build()?;
        Ok(cache)
    }

    fn backend(config: &AppConfig) -> Result<Arc<dyn StorageBackend>> {
        match config.cache.storage {
            StorageKind::File => {
                let dir = config.storage_dir();
                debug!("Using file storage at {}", dir.display());
                let backend = FileBackend::new(dir.clone()).with_context(|| {
                    format!("Failed to open storage directory {}", dir.display())
                })?;
                Ok(Arc::new(backend))
            }
            StorageKind::Memory => {
                debug!("Using in-memory storage");
                Ok(Arc::new(MemoryBackend::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgcache_core::{InitState, ProfileKind};
    use tempfile::TempDir;

    fn file_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.storage_dir = Some(dir.path().join("storage"));
        config
    }

    #[tokio::test]
    async fn test_file_cache_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("hero.png");
        std::fs::write(&image, b"png").unwrap();
        let url = format!("file://{}", image.display());
        let config = file_config(&temp_dir);

        let cache = CacheFactory::create(&config).unwrap();
        assert!(cache.cache_image_url(&url, Default::default()).await);
        cache.flush().await;

        let reopened = CacheFactory::create(&config).unwrap();
        assert!(reopened.is_image_cached(&url).await);
        assert_eq!(reopened.state(), InitState::Ready);
    }

    #[tokio::test]
    async fn test_memory_cache_applies_profile() {
        let mut config = AppConfig::default();
        config.cache.storage = StorageKind::Memory;
        config.cache.profile = ProfileKind::Constrained;
        config.cache.batch_size = Some(7);

        let cache = CacheFactory::create(&config).unwrap();
        let profile = cache.core().profile();
        assert_eq!(profile.remote_batch_size, 7);
        assert_eq!(profile.chunk_size, 50);
    }

    #[tokio::test]
    async fn test_registry_comes_from_assets_table() {
        let mut config = AppConfig::default();
        config.cache.storage = StorageKind::Memory;
        config
            .assets
            .insert("logo-full".to_string(), "logos/full.png".to_string());

        let cache = CacheFactory::create(&config).unwrap();
        assert!(cache.registry().contains("logo-full"));
    }
}
