//! Cache entry and payload types

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entries older than this are treated as absent
pub const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Opaque handle to a bundled/local asset
///
/// The registry decides what the handle means (a path, a resource id);
/// the cache only stores and returns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(String);

impl AssetHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a cache entry points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageData {
    /// A bundled asset resolved through the local registry
    Local { asset: AssetHandle },
    /// A remote image, addressed by its URL
    Remote { uri: String },
}

impl ImageData {
    pub fn local(asset: AssetHandle) -> Self {
        Self::Local { asset }
    }

    pub fn remote(uri: impl Into<String>) -> Self {
        Self::Remote { uri: uri.into() }
    }
}

/// A source handed to the prefetch primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Asset(&'a AssetHandle),
    Url(&'a str),
}

impl ImageSource<'_> {
    /// Identifier used in logs and error messages
    pub fn id(&self) -> &str {
        match self {
            ImageSource::Asset(handle) => handle.as_str(),
            ImageSource::Url(url) => url,
        }
    }
}

/// Timestamped cache value
///
/// Entries are never mutated after insertion; a refresh replaces the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    data: ImageData,
    timestamp: i64,
}

impl CacheEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(data: ImageData) -> Self {
        Self::with_timestamp(data, Utc::now().timestamp_millis())
    }

    /// Create an entry with an explicit creation time (ms since epoch)
    pub fn with_timestamp(data: ImageData, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    pub fn data(&self) -> &ImageData {
        &self.data
    }

    pub fn into_data(self) -> ImageData {
        self.data
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn age_ms(&self, now: i64) -> i64 {
        now - self.timestamp
    }

    /// Expired once its age reaches the TTL
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.age_ms(now) >= CACHE_TTL_MS
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_fresh_entry_not_expired() {
        let entry = CacheEntry::new(ImageData::remote("https://a.example/1.png"));
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = CacheEntry::with_timestamp(ImageData::remote("u"), NOW);

        assert!(!entry.is_expired_at(NOW + CACHE_TTL_MS - 1));
        assert!(entry.is_expired_at(NOW + CACHE_TTL_MS));
        assert!(entry.is_expired_at(NOW + CACHE_TTL_MS + 1));
    }

    #[test]
    fn test_clock_skew_is_not_expired() {
        let entry = CacheEntry::with_timestamp(ImageData::remote("u"), NOW);
        assert!(!entry.is_expired_at(NOW - 60_000));
        assert_eq!(entry.age_ms(NOW - 60_000), -60_000);
    }

    #[test]
    fn test_entry_serialization_shape() {
        let entry = CacheEntry::with_timestamp(ImageData::remote("https://x/y.png"), 42);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["data"]["kind"], "remote");
        assert_eq!(json["data"]["uri"], "https://x/y.png");

        let local = CacheEntry::with_timestamp(
            ImageData::local(AssetHandle::new("assets/logo-full.png")),
            7,
        );
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["data"]["kind"], "local");
        assert_eq!(json["data"]["asset"], "assets/logo-full.png");
    }

    #[test]
    fn test_image_source_id() {
        let handle = AssetHandle::new("assets/logo.png");
        assert_eq!(ImageSource::Asset(&handle).id(), "assets/logo.png");
        assert_eq!(ImageSource::Url("https://x").id(), "https://x");
    }
}
