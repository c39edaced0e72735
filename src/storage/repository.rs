use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::content::ContentItem;
use crate::error::{Error, Result};
use crate::sitemap::FeedQuery;
use crate::storage::traits::ContentRepository;

/// Memory-only content repository for testing and development
#[derive(Clone, Default)]
pub struct MemoryRepository {
    items: Arc<RwLock<Vec<ContentItem>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<ContentItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Insert or replace the item with the same id.
    pub fn upsert(&self, item: ContentItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    pub fn remove(&self, id: u64) -> Option<ContentItem> {
        let mut items = self.items.write();
        let index = items.iter().position(|item| item.id == id)?;
        Some(items.remove(index))
    }

    pub fn get(&self, id: u64) -> Option<ContentItem> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn find(&self, query: &FeedQuery, now: DateTime<Utc>) -> Result<Vec<ContentItem>> {
        let items = self.items.read().clone();
        Ok(query.apply(items, now))
    }
}

/// Repository backed by a JSON array of content items, exported by the host
/// platform. The file is read on every query.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<ContentItem>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Repository(format!(
                "Failed to read content file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::Repository(format!(
                "Invalid content file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl ContentRepository for JsonFileRepository {
    async fn find(&self, query: &FeedQuery, now: DateTime<Utc>) -> Result<Vec<ContentItem>> {
        let items = self.load().await?;
        debug!("Loaded {} content items from {}", items.len(), self.path.display());
        Ok(query.apply(items, now))
    }
}
