use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::content::ContentItem;
use crate::error::Result;
use crate::sitemap::FeedQuery;

/// Content query interface of the host platform.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Return the items matching `query` as of `now`, already filtered,
    /// ordered and capped. Backend failures are `Error::Repository`.
    async fn find(&self, query: &FeedQuery, now: DateTime<Utc>) -> Result<Vec<ContentItem>>;
}

/// Key-value cache with absolute per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove `key`. Returns whether a live entry was removed; removing an
    /// absent key is not an error.
    async fn delete(&self, key: &str) -> Result<bool>;
}

/// Key-value settings of the host platform.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Append-only sink for ping attempt lines.
#[async_trait]
pub trait PingLog: Send + Sync {
    async fn append(&self, line: &str) -> Result<()>;

    /// Every line appended since the last clear, oldest first.
    async fn read_all(&self) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;
}
