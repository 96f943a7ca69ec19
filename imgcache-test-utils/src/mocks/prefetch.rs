//! Mock prefetch primitive

use async_trait::async_trait;
use imgcache_core::entry::ImageSource;
use imgcache_core::error::FetchError;
use imgcache_core::prefetch::Prefetcher;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Configurable prefetcher for testing
///
/// Succeeds for every source unless told otherwise. Sources are identified
/// by [`ImageSource::id`]: the URL for remote images, the asset handle for
/// local ones.
#[derive(Default)]
pub struct MockPrefetcher {
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockPrefetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every prefetch of `id`
    pub fn fail_for(self, id: &str) -> Self {
        self.set_failing(id, true);
        self
    }

    /// Delay every prefetch by `delay`
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.default_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Delay prefetches of `id` by `delay`
    pub fn with_delay_for(self, id: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap()
            .insert(id.to_string(), delay);
        self
    }

    pub fn set_failing(&self, id: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
    }

    /// Every prefetched id, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == id)
            .count()
    }

    /// Highest number of prefetches observed in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prefetcher for MockPrefetcher {
    async fn prefetch(&self, source: &ImageSource<'_>) -> Result<(), FetchError> {
        let id = source.id().to_string();
        self.calls.lock().unwrap().push(id.clone());

        let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .or(*self.default_delay.lock().unwrap());
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&id) {
            Err(FetchError::prefetch(&id, "mock prefetch failure"))
        } else {
            Ok(())
        }
    }
}
