//! Image prefetch primitive
//!
//! The cache never transfers image bytes itself. A [`Prefetcher`] supplied
//! by the host warms whatever lower-level image store exists (an HTTP cache,
//! a decoded-image pool) and reports whether the source was reachable.

use crate::entry::ImageSource;
use crate::error::FetchError;
use async_trait::async_trait;

/// Platform image loading hook
#[async_trait]
pub trait Prefetcher: Send + Sync {
    /// Make `source` available locally
    ///
    /// Fails when the source is unreachable or invalid.
    async fn prefetch(&self, source: &ImageSource<'_>) -> Result<(), FetchError>;
}

/// Prefetcher that accepts every source without doing any work
///
/// Useful when the cache is only used to remember which images were seen.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrefetcher;

#[async_trait]
impl Prefetcher for NoopPrefetcher {
    async fn prefetch(&self, _source: &ImageSource<'_>) -> Result<(), FetchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AssetHandle;

    #[tokio::test]
    async fn test_noop_prefetcher_accepts_everything() {
        let prefetcher = NoopPrefetcher;
        let handle = AssetHandle::new("assets/logo.png");
        assert!(prefetcher.prefetch(&ImageSource::Asset(&handle)).await.is_ok());
        assert!(
            prefetcher
                .prefetch(&ImageSource::Url("https://img.example/a.png"))
                .await
                .is_ok()
        );
    }
}
