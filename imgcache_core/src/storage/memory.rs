//! Memory-based storage backend
//!
//! Keeps records in a map for the lifetime of the process. Useful as the
//! default when no durable storage is configured, and in tests.

use crate::error::StorageError;
use crate::storage::{StorageBackend, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process record store with an optional per-record size limit
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<HashMap<String, String>>>,
    max_record_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create an unbounded memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects records larger than `limit` bytes
    pub fn with_record_limit(limit: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            max_record_bytes: Some(limit),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no records are stored
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Sorted list of stored record keys
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(limit) = self.max_record_bytes
            && value.len() > limit
        {
            return Err(StorageError::record_too_large(key, value.len(), limit));
        }

        self.records
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.records.write().await.remove(key);
        Ok(())
    }
}
