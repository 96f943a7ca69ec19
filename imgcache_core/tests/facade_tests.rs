//! End-to-end behaviour of the public cache surface
//!
//! Covers idempotent insertion, single in-flight initialization, batch
//! partial failure, the local asset scenario, TTL handling through the
//! facade, and degraded operation when storage is broken.

use futures::future::join_all;
use imgcache_core::*;
use imgcache_test_utils::{
    ManualClock, MockPrefetcher, MockStorageBackend, RecordingProgress, RecordingSink,
    TestDataBuilder,
};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    cache: Arc<ImageCache>,
    backend: MockStorageBackend,
    prefetcher: Arc<MockPrefetcher>,
    clock: Arc<ManualClock>,
    events: Arc<RecordingSink>,
}

fn fixture_with(backend: MockStorageBackend, prefetcher: MockPrefetcher) -> Fixture {
    let prefetcher = Arc::new(prefetcher);
    let clock = Arc::new(ManualClock::default());
    let events = Arc::new(RecordingSink::new());

    let cache = ImageCache::builder()
        .storage(Arc::new(backend.clone()))
        .prefetcher(prefetcher.clone())
        .registry(TestDataBuilder::new().with_logo_assets().registry())
        .clock(clock.clone())
        .events(events.clone())
        .build()
        .unwrap();

    Fixture {
        cache: Arc::new(cache),
        backend,
        prefetcher,
        clock,
        events,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockStorageBackend::new(), MockPrefetcher::new())
}

#[cfg(test)]
mod insertion_tests {
    use super::*;

    /// Caching the same URL twice fetches once and keeps one entry
    #[tokio::test]
    async fn test_cache_url_twice_is_fast_path() {
        // Arrange
        let f = fixture();
        let url = "https://img.example.com/profile/42.jpg";

        // Act
        let first = f.cache.cache_image_url(url, CacheUrlOptions::default()).await;
        let second = f.cache.cache_image_url(url, CacheUrlOptions::default()).await;

        // Assert
        assert!(first);
        assert!(second);
        assert_eq!(f.prefetcher.calls_for(url), 1);

        let stats = f.cache.stats().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.valid_keys, vec![url.to_string()]);
    }

    /// Two callers racing on one URL share a single fetch
    #[tokio::test]
    async fn test_concurrent_cache_url_fetches_once() {
        // Arrange
        let f = fixture_with(
            MockStorageBackend::new(),
            MockPrefetcher::new().with_delay(Duration::from_millis(50)),
        );
        let url = "https://img.example.com/profile/7.jpg";

        // Act
        let (first, second) = tokio::join!(
            f.cache.cache_image_url(url, CacheUrlOptions::default()),
            f.cache.cache_image_url(url, CacheUrlOptions::default())
        );

        // Assert
        assert!(first);
        assert!(second);
        assert_eq!(f.prefetcher.calls_for(url), 1);
        assert!(f.cache.is_image_cached(url).await);
    }

    /// Five URLs where the second and fourth fail
    #[tokio::test]
    async fn test_cache_urls_partial_failure() {
        // Arrange
        let urls = TestDataBuilder::new().with_remote_urls(5).urls();
        let prefetcher = MockPrefetcher::new().fail_for(&urls[1]).fail_for(&urls[3]);
        let f = fixture_with(MockStorageBackend::new(), prefetcher);
        let progress = RecordingProgress::new();

        // Act
        let report = f.cache.cache_image_urls(&urls, &progress).await.unwrap();

        // Assert
        assert_eq!(report.total, 5);
        assert_eq!(report.successful, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.completed.len(), report.successful);

        let mut failed: Vec<&str> = report.errors.iter().map(|e| e.key.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec![urls[1].as_str(), urls[3].as_str()]);

        let mut completed = report.completed.clone();
        completed.sort();
        assert_eq!(
            completed,
            vec![urls[0].clone(), urls[2].clone(), urls[4].clone()]
        );

        assert_eq!(progress.items().len(), 5);
        assert_eq!(progress.completions(), 1);
        for url in [&urls[0], &urls[2], &urls[4]] {
            assert!(f.cache.is_image_cached(url).await);
        }
        assert!(!f.cache.is_image_cached(&urls[1]).await);
    }

    /// `logo-icon` is not in the registry
    #[tokio::test]
    async fn test_local_scenario_with_missing_asset() {
        // Arrange
        let f = fixture();
        let keys: Vec<String> = ["logo-full", "logo-icon", "logo-small"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let progress = RecordingProgress::new();

        // Act
        let report = f
            .cache
            .preload_local_images(Some(&keys), &progress)
            .await
            .unwrap();

        // Assert
        assert_eq!(report.total, 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            report.errors,
            vec![ItemFailure {
                key: "logo-icon".to_string(),
                error: "Local image not found: logo-icon".to_string(),
            }]
        );
        assert_eq!(report.completed, vec!["logo-full", "logo-small"]);

        // Progress is reported for every key, in order, failures included
        let items = progress.items();
        let current: Vec<&str> = items.iter().map(|i| i.3.as_str()).collect();
        assert_eq!(current, vec!["logo-full", "logo-icon", "logo-small"]);
        let percents: Vec<u32> = items.iter().map(|i| i.0.round() as u32).collect();
        assert_eq!(percents, vec![33, 67, 100]);
    }

    #[tokio::test]
    async fn test_preload_all_runs_local_then_remote() {
        let f = fixture();
        let urls = TestDataBuilder::new().with_remote_urls(2).urls();
        let keys = vec!["logo-small".to_string()];

        let combined = f
            .cache
            .preload_all_images(&keys, &urls, &NullProvider)
            .await
            .unwrap();

        assert_eq!(combined.total, 3);
        assert_eq!(combined.successful, 3);
        assert_eq!(combined.failed, 0);
        assert_eq!(
            f.prefetcher.calls()[0],
            "assets/images/logos/logo-small.png"
        );
    }

    #[tokio::test]
    async fn test_batch_cache_zero_size_is_rejected() {
        let f = fixture();
        let urls = TestDataBuilder::new().with_remote_urls(2).urls();

        let result = f.cache.batch_cache(&urls, 0, &NullProvider).await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(f.prefetcher.call_count(), 0);
    }
}

#[cfg(test)]
mod initialization_tests {
    use super::*;

    /// N concurrent waiters share one store read
    #[tokio::test]
    async fn test_concurrent_init_reads_store_once() {
        // Arrange
        let backend = MockStorageBackend::new().with_read_delay(Duration::from_millis(20));
        let f = fixture_with(backend, MockPrefetcher::new());
        let meta_key = f.cache.core().store().meta_key();

        // Act
        let waiters = (0..8).map(|_| {
            let cache = Arc::clone(&f.cache);
            async move { cache.wait_for_init().await }
        });
        join_all(waiters).await;

        // Assert
        assert_eq!(f.cache.state(), InitState::Ready);
        assert_eq!(f.backend.get_count(&meta_key), 1);
    }

    #[tokio::test]
    async fn test_operations_trigger_initialization() {
        let f = fixture();
        assert_eq!(f.cache.state(), InitState::Uninitialized);

        assert!(!f.cache.is_image_cached("https://img.example.com/x.png").await);
        assert_eq!(f.cache.state(), InitState::Ready);
    }

    /// A broken store still ends in Ready with an empty cache
    #[tokio::test]
    async fn test_failed_load_still_reaches_ready() {
        let backend = MockStorageBackend::new();
        backend.fail_reads(true);
        let f = fixture_with(backend, MockPrefetcher::new());

        f.cache.wait_for_init().await;

        assert_eq!(f.cache.state(), InitState::Ready);
        assert_eq!(f.cache.stats().await.total, 0);
        assert_eq!(f.events.storage_failures(), vec![StorageOp::Load]);
    }

    /// Writes racing the startup load are queued, not lost
    #[tokio::test]
    async fn test_put_before_ready_is_applied_after_load() {
        let f = fixture();
        let core = f.cache.core();

        core.put("early", ImageData::remote("https://img.example.com/early.png"))
            .await;
        assert!(f.events.contains(&CacheEvent::WriteQueued {
            key: "early".to_string()
        }));

        assert!(f.cache.is_image_cached("early").await);
    }
}

#[cfg(test)]
mod expiry_tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_entry_reads_as_missing() {
        let f = fixture();
        let url = "https://img.example.com/banner.png";
        assert!(f.cache.cache_image_url(url, CacheUrlOptions::default()).await);

        f.clock.advance_ms(CACHE_TTL_MS - 1);
        assert!(f.cache.is_image_cached(url).await);

        f.clock.advance_ms(1);
        let stats = f.cache.stats().await;
        assert_eq!(stats.total, stats.valid + stats.expired);
        assert_eq!(stats.expired_keys, vec![url.to_string()]);

        assert_eq!(f.cache.get_cached_image(url).await, None);
        assert_eq!(f.cache.stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let f = fixture();
        let url = "https://img.example.com/banner.png";
        assert!(f.cache.cache_image_url(url, CacheUrlOptions::default()).await);

        f.clock.advance_ms(CACHE_TTL_MS);
        assert!(f.cache.cache_image_url(url, CacheUrlOptions::default()).await);

        assert_eq!(f.prefetcher.calls_for(url), 2);
        assert!(f.cache.is_image_cached(url).await);
    }

    #[tokio::test]
    async fn test_clear_expired_returns_count() {
        let f = fixture();
        let urls = TestDataBuilder::new().with_remote_urls(3).urls();
        f.cache.cache_image_urls(&urls[..2], &NullProvider).await.unwrap();
        f.clock.advance_ms(CACHE_TTL_MS);
        f.cache.cache_image_urls(&urls[2..], &NullProvider).await.unwrap();

        assert_eq!(f.cache.clear_expired_cache().await, 2);

        let stats = f.cache.stats().await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.valid_keys, vec![urls[2].clone()]);
    }
}

#[cfg(test)]
mod degraded_mode_tests {
    use super::*;

    /// Storage write failures never reach the caller
    #[tokio::test]
    async fn test_write_failures_are_swallowed() {
        let backend = MockStorageBackend::new();
        backend.fail_writes(true);
        let f = fixture_with(backend, MockPrefetcher::new());
        let url = "https://img.example.com/a.png";

        assert!(f.cache.cache_image_url(url, CacheUrlOptions::default()).await);
        f.cache.flush().await;

        assert!(f.cache.is_image_cached(url).await);
        assert!(f.events.storage_failures().contains(&StorageOp::Save));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_entries_cached_before_deadline() {
        let prefetcher = MockPrefetcher::new()
            .with_delay_for("assets/images/logos/logo-full.png", Duration::from_millis(10))
            .with_delay_for("assets/images/logos/logo-small.png", Duration::from_secs(60));
        let f = fixture_with(MockStorageBackend::new(), prefetcher);
        let keys = vec!["logo-full".to_string(), "logo-small".to_string()];
        let progress = RecordingProgress::new();

        let err = f
            .cache
            .preload_images_with_timeout(&keys, Duration::from_secs(30), &progress)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Image preloading timed out after 30000ms"
        );
        assert!(f.cache.is_image_cached("logo-full").await);
        assert!(!f.cache.is_image_cached("logo-small").await);
        assert!(matches!(
            progress.last(),
            Some(ProgressUpdate::Failed { .. })
        ));
    }
}
