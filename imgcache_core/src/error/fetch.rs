//! Fetch related error types

use thiserror::Error;

/// Errors raised while resolving or prefetching an image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Requested local key has no registry entry
    #[error("Local image not found: {key}")]
    AssetNotFound { key: String },

    /// The platform prefetch primitive rejected the source
    #[error("Failed to prefetch '{source_id}': {message}")]
    Prefetch { source_id: String, message: String },
}

impl FetchError {
    /// Create an asset not found error
    pub fn asset_not_found(key: &str) -> Self {
        Self::AssetNotFound {
            key: key.to_string(),
        }
    }

    /// Create a prefetch failure
    pub fn prefetch(source_id: &str, message: impl Into<String>) -> Self {
        Self::Prefetch {
            source_id: source_id.to_string(),
            message: message.into(),
        }
    }

    /// Network failures may succeed later; a missing registry entry never will
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Prefetch { .. })
    }
}
