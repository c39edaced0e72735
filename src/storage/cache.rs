use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::storage::traits::CacheStore;

/// Cache entry with expiration tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now: DateTime<Utc>, ttl: Duration) -> Result<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| Error::CacheBackend(format!("TTL out of range: {}", e)))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::CacheBackend(format!("TTL of {}s overflows the expiry time", ttl.num_seconds())))?;
        Ok(Self {
            data,
            created_at: now,
            expires_at,
        })
    }

    /// An entry is live only while `now < created_at + ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub writes: u64,
    pub deletes: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-process cache store. Each key is updated atomically; there is no
/// capacity limit and no LRU eviction, only absolute expiry.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Arc<DashMap<String, CacheEntry<Vec<u8>>>>,
    stats: Arc<RwLock<CacheStats>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            clock,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        stats.total_entries = self.entries.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        self.stats.write().expirations += removed as u64;
        removed
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.stats.write().hits += 1;
                return Ok(Some(entry.data.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
            self.stats.write().expirations += 1;
        }
        self.stats.write().misses += 1;
        Ok(None)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now(), ttl)?;
        self.entries.insert(key.to_string(), entry);
        self.stats.write().writes += 1;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = self.clock.now();
        let removed = self
            .entries
            .remove(key)
            .map(|(_, entry)| !entry.is_expired(now))
            .unwrap_or(false);
        if removed {
            self.stats.write().deletes += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemoryCacheStore::with_clock(clock());

        cache.put("key", b"value".to_vec(), Duration::from_secs(60)).await.unwrap();
        let value = cache.get("key").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"value"[..]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_overflowing_ttl_is_backend_error() {
        let store = MemoryCacheStore::with_clock(clock());

        let result = store
            .put("k", b"doc".to_vec(), Duration::from_secs(10_000_000_000_000))
            .await;
        assert!(matches!(result, Err(Error::CacheBackend(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = MemoryCacheStore::with_clock(clock());

        assert!(cache.get("nonexistent").await.unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_entry_expires_exactly_at_ttl() {
        let clock = clock();
        let cache = MemoryCacheStore::with_clock(clock.clone());

        cache.put("key", b"doc".to_vec(), Duration::from_secs(3600)).await.unwrap();

        clock.advance(chrono::Duration::seconds(3599));
        assert!(cache.get("key").await.unwrap().is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.get("key").await.unwrap().is_none());
        assert!(!cache.contains("key"));
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MemoryCacheStore::with_clock(clock());

        assert!(!cache.delete("missing").await.unwrap());
        assert!(cache.is_empty());

        cache.put("key", b"doc".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert!(cache.delete("key").await.unwrap());
        assert!(!cache.delete("key").await.unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_expired_entry_reports_nothing_removed() {
        let clock = clock();
        let cache = MemoryCacheStore::with_clock(clock.clone());

        cache.put("key", b"doc".to_vec(), Duration::from_secs(60)).await.unwrap();
        clock.advance(chrono::Duration::minutes(2));

        assert!(!cache.delete("key").await.unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let clock = clock();
        let cache = MemoryCacheStore::with_clock(clock.clone());

        cache.put("a", vec![1], Duration::from_secs(10)).await.unwrap();
        cache.put("b", vec![2], Duration::from_secs(10)).await.unwrap();
        clock.advance(chrono::Duration::seconds(20));
        cache.put("c", vec![3], Duration::from_secs(10)).await.unwrap();

        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 2;
        stats.misses = 1;
        assert!((stats.hit_rate() - 0.6666666666666666).abs() < f64::EPSILON);
    }
}
