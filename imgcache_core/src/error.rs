//! Error types for the image cache core library
//!
//! Errors are grouped by where they originate so callers can decide how much
//! of a failure to surface. Per-item failures inside batch operations never
//! escape as `Err`; they are captured into the batch report instead.

use thiserror::Error;

pub mod fetch;
pub mod storage;
pub mod validation;

pub use self::fetch::FetchError;
pub use self::storage::StorageError;
pub use self::validation::{ValidationError, validate_url};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the image cache core library
///
/// - Fetch errors: unknown local assets and failed prefetches
/// - Storage errors: persistence backend failures (normally swallowed)
/// - Validation errors: malformed input or profile values
/// - Timeout: raised only by the explicit timeout wrappers
#[derive(Error, Debug)]
pub enum Error {
    /// Asset lookup or prefetch failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Input validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Operation did not finish before its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl Error {
    /// Create a timeout error for the named operation
    pub fn timeout(operation: &str, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            timeout_ms,
        }
    }

    /// Whether retrying the same operation later could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_recoverable(),
            Self::Storage(err) => err.is_recoverable(),
            Self::Validation(_) => false,
            Self::Timeout { .. } => true,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(StorageError::serialization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_not_found_message() {
        let error = Error::from(FetchError::asset_not_found("logo-icon"));
        assert_eq!(error.to_string(), "Local image not found: logo-icon");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_timeout_error() {
        let error = Error::timeout("Image preloading", 30_000);
        assert_eq!(error.to_string(), "Image preloading timed out after 30000ms");
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_invalid_url_converts_to_validation_error() {
        let error = Error::from(validate_url("not a url").unwrap_err());
        assert!(matches!(error, Error::Validation(_)));
        assert!(validate_url("https://img.example/a.png").is_ok());
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let error = Error::from(StorageError::backend("image_cache:meta", "disk full"));
        assert!(error.to_string().contains("image_cache:meta"));
        assert!(error.to_string().contains("disk full"));

        match error {
            Error::Storage(StorageError::Backend { key, .. }) => {
                assert_eq!(key, "image_cache:meta");
            }
            _ => panic!("Expected Storage::Backend error"),
        }
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let error = Error::from(parse_err);
        assert!(matches!(
            error,
            Error::Storage(StorageError::Serialization { .. })
        ));
    }

    #[test]
    fn test_validation_error_not_recoverable() {
        let error = Error::from(ValidationError::invalid_argument("url", "must not be empty"));
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("url"));
    }
}
