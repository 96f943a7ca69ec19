//! Storage related error types

use thiserror::Error;

/// Persistence backend errors
///
/// These are swallowed by the persistent store: the cache keeps working
/// in memory and the failure is only logged and reported to the event sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend read/write/remove failed
    #[error("Storage backend failed for record '{key}': {message}")]
    Backend { key: String, message: String },

    /// Record present but unusable
    #[error("Corrupt snapshot record '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot serialization failed: {message}")]
    Serialization { message: String },

    /// Backend refused a record over its size limit
    #[error("Record '{key}' is {size} bytes, exceeding the backend limit of {limit} bytes")]
    RecordTooLarge { key: String, size: usize, limit: usize },
}

impl StorageError {
    /// Create a backend error
    pub fn backend(key: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create a corrupt record error
    pub fn corrupt(key: &str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a record too large error
    pub fn record_too_large(key: &str, size: usize, limit: usize) -> Self {
        Self::RecordTooLarge {
            key: key.to_string(),
            size,
            limit,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}
