use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sitemap::Fingerprint;
use crate::storage::CacheStore;

/// Lifetime of a generated document.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Memoizes encoded documents by query fingerprint on top of a shared
/// cache store. Entries expire absolutely after the TTL.
#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>> {
        let Some(bytes) = self.store.get(fingerprint.as_str()).await? else {
            return Ok(None);
        };

        let document = String::from_utf8(bytes).map_err(|_| {
            Error::CacheBackend(format!("Cached document {} is not UTF-8", fingerprint))
        })?;
        Ok(Some(document))
    }

    pub async fn put(&self, fingerprint: &Fingerprint, document: &str) -> Result<()> {
        self.put_with_ttl(fingerprint, document, self.ttl).await
    }

    pub async fn put_with_ttl(&self, fingerprint: &Fingerprint, document: &str, ttl: Duration) -> Result<()> {
        self.store
            .put(fingerprint.as_str(), document.as_bytes().to_vec(), ttl)
            .await
    }

    /// Drop the document for `fingerprint`. Absent or expired entries are
    /// left alone and reported as `false`.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let removed = self.store.delete(fingerprint.as_str()).await?;
        debug!("Invalidated {} (entry present: {})", fingerprint, removed);
        Ok(removed)
    }
}
