//! Batch preloading
//!
//! Drives fetch-and-cache over collections of local asset keys and remote
//! URLs. Per-item failures are recorded in the returned [`PreloadReport`];
//! only invalid input or an expired deadline fails a whole run.

use crate::cache::ImageCacheCore;
use crate::entry::{ImageData, ImageSource};
use crate::error::{Error, FetchError, Result, ValidationError, validate_url};
use crate::prefetch::Prefetcher;
use crate::profile::PlatformProfile;
use crate::progress::{ProgressProvider, ProgressUpdate};
use crate::registry::AssetRegistry;
use crate::report::{CombinedReport, PreloadReport};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Remote batches between cooperative yields
const BATCHES_PER_YIELD: usize = 2;

type FetchLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Per-URL fetch locks so one URL is never fetched twice at the same time
#[derive(Default)]
struct InFlight {
    locks: FetchLocks,
}

impl InFlight {
    /// Take the fetch lock for `url`
    ///
    /// The flag is `true` when another fetch of the same URL held the lock
    /// and had to be waited for.
    async fn acquire(&self, url: &str) -> (FetchSlot, bool) {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(url.to_string()).or_default().clone()
        };

        let (guard, waited) = match lock.clone().try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => (lock.clone().lock_owned().await, true),
        };

        let slot = FetchSlot {
            locks: self.locks.clone(),
            url: url.to_string(),
            lock,
            guard: Some(guard),
        };
        (slot, waited)
    }
}

/// Held for the duration of one URL fetch; forgets the lock once unused
struct FetchSlot {
    locks: FetchLocks,
    url: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FetchSlot {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this slot still point at the lock
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.url);
        }
    }
}

/// Coordinates the registry, the prefetch primitive and the cache
pub struct BatchFetchOrchestrator {
    core: Arc<ImageCacheCore>,
    registry: Arc<AssetRegistry>,
    prefetcher: Arc<dyn Prefetcher>,
    in_flight: InFlight,
}

impl BatchFetchOrchestrator {
    pub fn new(
        core: Arc<ImageCacheCore>,
        registry: Arc<AssetRegistry>,
        prefetcher: Arc<dyn Prefetcher>,
    ) -> Self {
        Self {
            core,
            registry,
            prefetcher,
            in_flight: InFlight::default(),
        }
    }

    fn profile(&self) -> &PlatformProfile {
        self.core.profile()
    }

    /// Preload local assets one after another, in input order
    ///
    /// Unknown keys fail with "Local image not found: <key>". One progress
    /// update is reported per key whatever its outcome.
    pub async fn preload_local(
        &self,
        keys: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        let total = keys.len();
        let mut report = PreloadReport::new(total);

        for (index, key) in keys.iter().enumerate() {
            match self.cache_local(key).await {
                Ok(()) => report.record_success(key),
                Err(e) => {
                    debug!("Local preload failed for {key}: {e}");
                    report.record_failure(key, &e);
                }
            }

            progress.report(ProgressUpdate::item(index + 1, total, key.as_str()));

            if self.profile().should_yield_after(index + 1) {
                tokio::task::yield_now().await;
            }
        }

        finish(progress, &report);
        Ok(report)
    }

    /// Preload remote URLs using the profile's batch size
    pub async fn preload_remote(
        &self,
        urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        self.batch_cache(urls, self.profile().remote_batch_size, progress)
            .await
    }

    /// Cache URLs in consecutive concurrent batches
    ///
    /// All fetches of a batch run concurrently and settle before the next
    /// batch starts. Progress is cumulative over the whole run. Constrained
    /// profiles cap `batch_size` at their own remote batch size. Repeated
    /// URLs are fetched and counted once.
    pub async fn batch_cache(
        &self,
        urls: &[String],
        batch_size: usize,
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        if batch_size == 0 {
            let err = ValidationError::invalid_argument("batch_size", "must be greater than 0");
            progress.report(ProgressUpdate::Failed {
                message: err.to_string(),
            });
            return Err(err.into());
        }

        let batch_size = self.profile().effective_batch_size(batch_size);
        let mut seen = HashSet::new();
        let urls: Vec<&String> = urls
            .iter()
            .filter(|&url| seen.insert(url.as_str()))
            .collect();
        let total = urls.len();
        let mut report = PreloadReport::new(total);
        let mut settled = 0;

        debug!("Caching {total} URLs in batches of {batch_size}");

        for (batch_index, batch) in urls.chunks(batch_size).enumerate() {
            let mut in_flight = FuturesUnordered::new();
            for &url in batch {
                in_flight.push(async move { (url, self.cache_remote(url, false).await) });
            }

            while let Some((url, outcome)) = in_flight.next().await {
                settled += 1;
                match outcome {
                    Ok(()) => report.record_success(url),
                    Err(e) => {
                        debug!("Remote preload failed for {url}: {e}");
                        report.record_failure(url, &e);
                    }
                }
                progress.report(ProgressUpdate::item(settled, total, url.as_str()));
            }

            if self.profile().cooperative_yield && (batch_index + 1) % BATCHES_PER_YIELD == 0 {
                tokio::task::yield_now().await;
            }
        }

        finish(progress, &report);
        Ok(report)
    }

    /// Local preload, then remote preload, with merged counts
    pub async fn preload_all(
        &self,
        local_keys: &[String],
        remote_urls: &[String],
        progress: &dyn ProgressProvider,
    ) -> Result<CombinedReport> {
        let local_progress = progress.create_child("local");
        let local = self
            .preload_local(local_keys, local_progress.as_ref())
            .await?;

        let remote_progress = progress.create_child("remote");
        let remote = self
            .preload_remote(remote_urls, remote_progress.as_ref())
            .await?;

        let combined = CombinedReport::new(local, remote);
        progress.report(ProgressUpdate::Finished {
            successful: combined.successful,
            failed: combined.failed,
            total: combined.total,
        });
        progress.complete();
        Ok(combined)
    }

    /// Local preload that gives up waiting after `limit`
    ///
    /// Entries cached before the deadline stay cached.
    pub async fn preload_with_timeout(
        &self,
        keys: &[String],
        limit: Duration,
        progress: &dyn ProgressProvider,
    ) -> Result<PreloadReport> {
        match tokio::time::timeout(limit, self.preload_local(keys, progress)).await {
            Ok(result) => result,
            Err(_) => {
                let err = Error::timeout("Image preloading", limit.as_millis() as u64);
                warn!("{err}");
                progress.report(ProgressUpdate::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Resolve, prefetch and cache one local asset
    pub async fn cache_local(&self, key: &str) -> Result<()> {
        let handle = self
            .registry
            .resolve(key)
            .ok_or_else(|| FetchError::asset_not_found(key))?;

        self.prefetcher
            .prefetch(&ImageSource::Asset(handle))
            .await?;
        self.core.put(key, ImageData::local(handle.clone())).await;
        Ok(())
    }

    /// Prefetch and cache one remote URL
    ///
    /// A valid cached entry short-circuits the fetch unless `force_refresh`
    /// is set. A call that arrives while the same URL is being fetched waits
    /// for that fetch and reuses its entry, forced or not.
    pub async fn cache_remote(&self, url: &str, force_refresh: bool) -> Result<()> {
        validate_url(url)?;

        let (_slot, waited) = self.in_flight.acquire(url).await;
        if (waited || !force_refresh) && self.core.has(url).await {
            if waited {
                debug!("Reused concurrent fetch of {url}");
            }
            return Ok(());
        }

        self.prefetcher.prefetch(&ImageSource::Url(url)).await?;
        self.core.put(url, ImageData::remote(url)).await;
        Ok(())
    }
}

fn finish(progress: &dyn ProgressProvider, report: &PreloadReport) {
    progress.report(ProgressUpdate::Finished {
        successful: report.successful,
        failed: report.failed,
        total: report.total,
    });
    progress.complete();
}
