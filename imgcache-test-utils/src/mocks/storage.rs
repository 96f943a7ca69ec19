//! Mock storage backend with call accounting and failure injection

use async_trait::async_trait;
use imgcache_core::error::StorageError;
use imgcache_core::storage::{StorageBackend, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory storage backend for testing
///
/// Counts reads and writes per record, can be told to fail reads or writes,
/// can enforce a record size limit, and can delay reads so concurrent
/// callers overlap.
///
/// # Examples
///
/// ```rust,no_run
/// use imgcache_test_utils::MockStorageBackend;
/// use imgcache_core::storage::StorageBackend;
///
/// # async fn example() {
/// let backend = MockStorageBackend::new();
/// backend.set("k", "v").await.unwrap();
/// assert_eq!(backend.set_count("k"), 1);
///
/// backend.fail_writes(true);
/// assert!(backend.set("k", "v2").await.is_err());
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockStorageBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    records: HashMap<String, String>,
    gets: HashMap<String, usize>,
    sets: HashMap<String, usize>,
    removes: usize,
    fail_reads: bool,
    fail_writes: bool,
    record_limit: Option<usize>,
    read_delay: Option<Duration>,
}

impl MockStorageBackend {
    /// Create a new empty mock backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject records larger than `limit` bytes
    pub fn with_record_limit(self, limit: usize) -> Self {
        self.state.lock().unwrap().record_limit = Some(limit);
        self
    }

    /// Delay every read by `delay`
    pub fn with_read_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().read_delay = Some(delay);
        self
    }

    /// Make every read fail
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Make every write and remove fail
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Number of reads of `key`
    pub fn get_count(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .gets
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Number of writes of `key`
    pub fn set_count(&self, key: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .sets
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Number of writes across all keys
    pub fn total_sets(&self) -> usize {
        self.state.lock().unwrap().sets.values().sum()
    }

    pub fn remove_count(&self) -> usize {
        self.state.lock().unwrap().removes
    }

    /// Raw record contents, bypassing counters and failure injection
    pub fn record(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().records.get(key).cloned()
    }

    /// Overwrite a raw record, bypassing counters and failure injection
    pub fn put_record(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(key.to_string(), value.to_string());
    }

    /// Delete a raw record, bypassing counters and failure injection
    pub fn delete_record(&self, key: &str) {
        self.state.lock().unwrap().records.remove(key);
    }

    /// Sorted record keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.lock().unwrap().records.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Reset call counters, keeping records
    pub fn reset_counts(&self) {
        let mut state = self.state.lock().unwrap();
        state.gets.clear();
        state.sets.clear();
        state.removes = 0;
    }
}

#[async_trait]
impl StorageBackend for MockStorageBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            *state.gets.entry(key.to_string()).or_default() += 1;
            state.read_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(StorageError::backend(key, "mock read failure"));
        }
        Ok(state.records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        *state.sets.entry(key.to_string()).or_default() += 1;

        if state.fail_writes {
            return Err(StorageError::backend(key, "mock write failure"));
        }
        if let Some(limit) = state.record_limit
            && value.len() > limit
        {
            return Err(StorageError::record_too_large(key, value.len(), limit));
        }

        state.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.removes += 1;

        if state.fail_writes {
            return Err(StorageError::backend(key, "mock remove failure"));
        }
        state.records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_and_failures() {
        let backend = MockStorageBackend::new();
        backend.set("a", "1").await.unwrap();
        assert_eq!(backend.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(backend.get_count("a"), 1);
        assert_eq!(backend.set_count("a"), 1);

        backend.fail_reads(true);
        assert!(backend.get("a").await.is_err());
        assert_eq!(backend.get_count("a"), 2);

        backend.fail_writes(true);
        assert!(backend.set("b", "2").await.is_err());
        assert!(backend.record("b").is_none());
    }

    #[tokio::test]
    async fn test_record_limit() {
        let backend = MockStorageBackend::new().with_record_limit(2);
        assert!(matches!(
            backend.set("a", "123").await,
            Err(StorageError::RecordTooLarge { .. })
        ));
    }
}
