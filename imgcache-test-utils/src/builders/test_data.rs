//! Test data builders for creating test scenarios

use imgcache_core::entry::{AssetHandle, CacheEntry, ImageData};
use imgcache_core::registry::AssetRegistry;

/// Builder for cache contents, URL lists and asset registries
///
/// # Examples
///
/// ```rust,no_run
/// use imgcache_test_utils::TestDataBuilder;
///
/// let data = TestDataBuilder::new()
///     .with_remote_urls(3)
///     .with_local("logo-full", "logos/logo-full.png")
///     .created_at(1_700_000_000_000);
///
/// assert_eq!(data.urls().len(), 3);
/// assert_eq!(data.build_entries().len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct TestDataBuilder {
    remote: Vec<String>,
    local: Vec<(String, String)>,
    created_at: i64,
}

impl TestDataBuilder {
    /// Create a new test data builder
    pub fn new() -> Self {
        Self {
            remote: Vec::new(),
            local: Vec::new(),
            created_at: 1_700_000_000_000,
        }
    }

    /// Add `count` distinct remote image URLs
    pub fn with_remote_urls(mut self, count: usize) -> Self {
        let start = self.remote.len();
        self.remote.extend(
            (start..start + count).map(|i| format!("https://img.example.com/images/{i}.png")),
        );
        self
    }

    /// Add one remote URL
    pub fn with_remote(mut self, url: &str) -> Self {
        self.remote.push(url.to_string());
        self
    }

    /// Add one local asset
    pub fn with_local(mut self, key: &str, handle: &str) -> Self {
        self.local.push((key.to_string(), handle.to_string()));
        self
    }

    /// The `logo-full` and `logo-small` bundled logos
    pub fn with_logo_assets(self) -> Self {
        self.with_local("logo-full", "assets/images/logos/logo-full.png")
            .with_local("logo-small", "assets/images/logos/logo-small.png")
    }

    /// Timestamp stamped on built entries
    pub fn created_at(mut self, timestamp_ms: i64) -> Self {
        self.created_at = timestamp_ms;
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.remote.clone()
    }

    pub fn local_keys(&self) -> Vec<String> {
        self.local.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Registry containing every local asset
    pub fn registry(&self) -> AssetRegistry {
        self.local
            .iter()
            .map(|(key, handle)| (key.clone(), handle.clone()))
            .collect()
    }

    /// Cache entries for every local asset and remote URL
    pub fn build_entries(&self) -> Vec<(String, CacheEntry)> {
        let local = self.local.iter().map(|(key, handle)| {
            (
                key.clone(),
                CacheEntry::with_timestamp(
                    ImageData::local(AssetHandle::new(handle.clone())),
                    self.created_at,
                ),
            )
        });
        let remote = self.remote.iter().map(|url| {
            (
                url.clone(),
                CacheEntry::with_timestamp(ImageData::remote(url.clone()), self.created_at),
            )
        });
        local.chain(remote).collect()
    }
}

impl Default for TestDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}
