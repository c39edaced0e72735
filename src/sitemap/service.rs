use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::sitemap::{ContentSelector, FeedCache, FeedEncoder, FeedQuery, Fingerprint};
use crate::storage::{CacheStore, ContentRepository, PublicationSettings, SettingsStore};

/// Site-wide values the document needs that are not publication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub name: String,
    pub language: String,
}

impl SiteInfo {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Serves the news sitemap: settings -> query -> cache, falling back to
/// select + encode on a miss. Every call is independent; concurrent misses
/// each regenerate and overwrite the same entry.
#[derive(Clone)]
pub struct FeedService {
    selector: ContentSelector,
    encoder: FeedEncoder,
    cache: FeedCache,
    settings: Arc<dyn SettingsStore>,
    site: SiteInfo,
}

impl FeedService {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        cache_store: Arc<dyn CacheStore>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        site: SiteInfo,
    ) -> Self {
        Self {
            selector: ContentSelector::new(repository, clock),
            encoder: FeedEncoder::new(),
            cache: FeedCache::new(cache_store),
            settings,
            site,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = FeedCache::with_ttl(self.cache.store(), ttl);
        self
    }

    pub fn site(&self) -> &SiteInfo {
        &self.site
    }

    pub async fn settings(&self) -> PublicationSettings {
        PublicationSettings::load(self.settings.as_ref(), &self.site.name).await
    }

    /// The query the serving path uses for the current settings.
    pub async fn current_query(&self) -> FeedQuery {
        let settings = self.settings().await;
        FeedQuery::news(settings.category_filter.as_deref())
    }

    pub async fn fingerprint(&self) -> Fingerprint {
        self.current_query().await.fingerprint()
    }

    /// Current document, from cache when possible. Fails only when the
    /// cache misses and the repository query fails.
    pub async fn get(&self) -> Result<String> {
        let settings = self.settings().await;
        let query = FeedQuery::news(settings.category_filter.as_deref());
        let fingerprint = query.fingerprint();

        match self.cache.get(&fingerprint).await {
            Ok(Some(document)) => {
                debug!("Cache hit for {}", fingerprint);
                return Ok(document);
            }
            Ok(None) => debug!("Cache miss for {}", fingerprint),
            Err(e) => warn!("Cache read failed for {}, regenerating: {}", fingerprint, e),
        }

        let document = self.generate(&query, &settings).await?;

        if let Err(e) = self.cache.put(&fingerprint, &document).await {
            warn!("Failed to cache {}: {}", fingerprint, e);
        }

        Ok(document)
    }

    /// Build a document without consulting or touching the cache.
    pub async fn generate(&self, query: &FeedQuery, settings: &PublicationSettings) -> Result<String> {
        let items = self.selector.select(query).await?;
        let document = self
            .encoder
            .encode(&items, &settings.publication_name, &self.site.language);

        info!("Generated news sitemap with {} items ({} bytes)", items.len(), document.len());
        Ok(document)
    }

    /// Drop the cached document the serving path would return.
    pub async fn invalidate(&self) -> Result<bool> {
        let fingerprint = self.fingerprint().await;
        self.cache.invalidate(&fingerprint).await
    }

    /// Invalidate, then optionally rebuild the entry right away. Without
    /// `warm` the next request repopulates it.
    pub async fn regenerate(&self, warm: bool) -> Result<Option<String>> {
        let removed = self.invalidate().await?;
        info!("News sitemap cache invalidated (entry present: {})", removed);

        if warm {
            return self.get().await.map(Some);
        }
        Ok(None)
    }
}
