//! File-based storage backend
//!
//! Each record is one file under the storage directory. Writes go to a
//! temporary file first and are renamed into place, so a record is either
//! the old value or the new value, never a torn mix.

use crate::error::StorageError;
use crate::storage::{StorageBackend, StorageResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Record store backed by a directory of files
pub struct FileBackend {
    dir: PathBuf,
    max_record_bytes: Option<usize>,
}

impl FileBackend {
    /// Create a file backend rooted at `dir`, creating the directory if needed
    pub fn new(dir: PathBuf) -> StorageResult<Self> {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                StorageError::backend(
                    &dir.display().to_string(),
                    format!("Failed to create storage directory: {e}"),
                )
            })?;
        }

        Ok(Self {
            dir,
            max_record_bytes: None,
        })
    }

    /// Reject records larger than `limit` bytes
    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.max_record_bytes = Some(limit);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Map a record key onto a portable file name
///
/// ASCII alphanumerics, `-` and `_` pass through; everything else becomes
/// `%XX` so distinct keys never collide.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Write `value` to `path` and sync it to disk
async fn write_synced(path: &Path, value: &str) -> Result<(), String> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| format!("Failed to create record file: {e}"))?;
    file.write_all(value.as_bytes())
        .await
        .map_err(|e| format!("Failed to write record: {e}"))?;
    file.sync_all()
        .await
        .map_err(|e| format!("Failed to sync record: {e}"))
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.record_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::backend(
                key,
                format!("Failed to read record: {e}"),
            )),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(limit) = self.max_record_bytes
            && value.len() > limit
        {
            return Err(StorageError::record_too_large(key, value.len(), limit));
        }

        let path = self.record_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let committed = match write_synced(&tmp_path, value).await {
            Ok(()) => fs::rename(&tmp_path, &path)
                .await
                .map_err(|e| format!("Failed to commit record: {e}")),
            Err(e) => Err(e),
        };

        if let Err(message) = committed {
            // Best effort
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::backend(key, message));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::backend(
                key,
                format!("Failed to remove record: {e}"),
            )),
        }
    }
}
