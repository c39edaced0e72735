use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::storage::cache::CacheEntry;
use crate::storage::traits::CacheStore;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk form of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableCacheEntry {
    pub data: String,
    pub created_at: i64, // Unix timestamp
    pub expires_at: i64, // Unix timestamp
}

impl From<CacheEntry<String>> for SerializableCacheEntry {
    fn from(entry: CacheEntry<String>) -> Self {
        Self {
            data: entry.data,
            created_at: entry.created_at.timestamp(),
            expires_at: entry.expires_at.timestamp(),
        }
    }
}

impl From<SerializableCacheEntry> for CacheEntry<String> {
    fn from(entry: SerializableCacheEntry) -> Self {
        Self {
            data: entry.data,
            created_at: DateTime::from_timestamp(entry.created_at, 0).unwrap_or_default(),
            expires_at: DateTime::from_timestamp(entry.expires_at, 0).unwrap_or_default(),
        }
    }
}

/// Cache store keeping one JSON file per key, so separate processes
/// (the server and the CLI) share entries.
#[derive(Clone)]
pub struct FileCacheStore {
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(cache_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(cache_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            clock,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", file_name))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry<String>>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::CacheBackend(format!(
                    "Failed to read cache entry '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: SerializableCacheEntry = serde_json::from_str(&content).map_err(|e| {
            Error::CacheBackend(format!("Corrupt cache entry '{}': {}", path.display(), e))
        })?;
        Ok(Some(entry.into()))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::CacheBackend(format!(
                "Failed to remove cache entry '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        let Some(entry) = self.read_entry(&path).await? else {
            return Ok(None);
        };

        if entry.is_expired(self.clock.now()) {
            tracing::debug!("Cache entry expired: {}", path.display());
            self.remove_file(&path).await?;
            return Ok(None);
        }

        Ok(Some(entry.data.into_bytes()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let data = String::from_utf8(value)
            .map_err(|_| Error::CacheBackend(format!("Value for '{}' is not UTF-8", key)))?;
        let entry: SerializableCacheEntry = CacheEntry::new(data, self.clock.now(), ttl)?.into();
        let json_content = serde_json::to_string(&entry)?;

        fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            Error::CacheBackend(format!(
                "Failed to create cache directory '{}': {}",
                self.cache_dir.display(),
                e
            ))
        })?;

        // Write to a temporary file unique to this writer, then rename (atomic operation)
        let path = self.entry_path(key);
        let temp_file = path.with_extension(format!(
            "{}-{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp_file, json_content).await.map_err(|e| {
            Error::CacheBackend(format!("Failed to write cache to '{}': {}", temp_file.display(), e))
        })?;
        fs::rename(&temp_file, &path).await.map_err(|e| {
            Error::CacheBackend(format!(
                "Failed to rename cache file '{}' to '{}': {}",
                temp_file.display(),
                path.display(),
                e
            ))
        })?;

        tracing::debug!("Saved cache entry {}", path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        let live = match self.read_entry(&path).await {
            Ok(Some(entry)) => !entry.is_expired(self.clock.now()),
            Ok(None) => return Ok(false),
            // corrupt entries are removed all the same
            Err(_) => false,
        };

        self.remove_file(&path).await?;
        Ok(live)
    }
}
