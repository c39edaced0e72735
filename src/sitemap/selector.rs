use std::sync::Arc;

use tracing::debug;

use crate::clock::Clock;
use crate::content::ContentItem;
use crate::error::Result;
use crate::sitemap::FeedQuery;
use crate::storage::ContentRepository;

/// Picks the content eligible for the sitemap.
#[derive(Clone)]
pub struct ContentSelector {
    repository: Arc<dyn ContentRepository>,
    clock: Arc<dyn Clock>,
}

impl ContentSelector {
    pub fn new(repository: Arc<dyn ContentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Eligible items, newest first, at most `query.page_size` of them.
    /// Anything past the cap is dropped silently.
    pub async fn select(&self, query: &FeedQuery) -> Result<Vec<ContentItem>> {
        let now = self.clock.now();
        let mut items = self.repository.find(query, now).await?;

        // a backend that ignores the cap must not grow the document
        items.truncate(query.page_size);

        debug!(
            "Selected {} items (category: {}, cutoff: {:?})",
            items.len(),
            query.category.as_deref().unwrap_or("all"),
            query.cutoff(now)
        );
        Ok(items)
    }
}
