use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::content::{ContentItem, PostStatus, ARTICLE_POST_TYPE};

/// Most items a single sitemap document lists.
pub const PAGE_SIZE: usize = 1000;

/// How far back the news sitemap reaches.
pub const RECENCY_WINDOW_HOURS: i64 = 48;

/// Namespace for feed documents in a shared cache store.
pub const FINGERPRINT_PREFIX: &str = "news_sitemap_cache_";

/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedOrder {
    PublishedDesc,
}

impl FeedOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedOrder::PublishedDesc => "published_desc",
        }
    }
}

/// Parameters of one sitemap selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub post_type: String,
    pub status: PostStatus,
    pub page_size: usize,
    pub order: FeedOrder,
    pub window: Option<Duration>,
    pub category: Option<String>,
}

impl FeedQuery {
    /// The query the news sitemap is served from: published articles from the
    /// last 48 hours, optionally limited to one category.
    pub fn news(category: Option<&str>) -> Self {
        Self {
            post_type: ARTICLE_POST_TYPE.to_string(),
            status: PostStatus::Published,
            page_size: PAGE_SIZE,
            order: FeedOrder::PublishedDesc,
            window: Some(Duration::hours(RECENCY_WINDOW_HOURS)),
            category: normalize_category(category),
        }
    }

    pub fn with_window(mut self, window: Option<Duration>) -> Self {
        self.window = window;
        self
    }

    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = normalize_category(category);
        self
    }

    /// Oldest publication time still inside the window, if there is one.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window.map(|window| now - window)
    }

    pub fn matches(&self, item: &ContentItem, cutoff: Option<DateTime<Utc>>) -> bool {
        if item.status != self.status || item.post_type != self.post_type {
            return false;
        }

        if let Some(cutoff) = cutoff {
            if item.published < cutoff {
                return false;
            }
        }

        match &self.category {
            Some(slug) => item.in_category(slug),
            None => true,
        }
    }

    /// Filter, order and cap `items` the way every repository backend must.
    pub fn apply<I>(&self, items: I, now: DateTime<Utc>) -> Vec<ContentItem>
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let cutoff = self.cutoff(now);
        let mut selected: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| self.matches(item, cutoff))
            .collect();

        match self.order {
            FeedOrder::PublishedDesc => {
                selected.sort_by_key(|item| (Reverse(item.published), Reverse(item.id)));
            }
        }

        selected.truncate(self.page_size);
        selected
    }

    /// Cache key for the documents this query produces.
    ///
    /// Only the fields that change the selected set take part; the page size
    /// is fixed and left out.
    pub fn fingerprint(&self) -> Fingerprint {
        // serde_json objects keep keys sorted, giving a canonical encoding
        let canonical = json!({
            "post_type": self.post_type,
            "status": self.status.as_str(),
            "order": self.order.as_str(),
            "window_secs": self.window.map(|w| w.num_seconds()),
            "category": self.category,
        })
        .to_string();

        let hash = blake3::hash(canonical.as_bytes()).to_hex();
        Fingerprint(format!("{}{}", FINGERPRINT_PREFIX, &hash.as_str()[..32]))
    }
}

fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|slug| !slug.is_empty() && !slug.eq_ignore_ascii_case(ALL_CATEGORIES))
        .map(str::to_string)
}

/// Derived cache key for one query configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn item(id: u64, published: DateTime<Utc>) -> ContentItem {
        ContentItem::article(id, format!("https://example.com/{}", id), format!("Item {}", id), published)
    }

    #[test]
    fn test_news_query_defaults() {
        let query = FeedQuery::news(None);
        assert_eq!(query.post_type, "article");
        assert_eq!(query.status, PostStatus::Published);
        assert_eq!(query.page_size, 1000);
        assert_eq!(query.window, Some(Duration::hours(48)));
        assert!(query.category.is_none());
    }

    #[test]
    fn test_all_and_empty_category_mean_no_filter() {
        assert_eq!(FeedQuery::news(Some("all")).category, None);
        assert_eq!(FeedQuery::news(Some("ALL")).category, None);
        assert_eq!(FeedQuery::news(Some("  ")).category, None);
        assert_eq!(FeedQuery::news(Some(" politics ")).category, Some("politics".to_string()));
    }

    #[test]
    fn test_fingerprint_is_namespaced_128_bit() {
        let fp = FeedQuery::news(None).fingerprint();
        assert!(fp.as_str().starts_with(FINGERPRINT_PREFIX));
        assert_eq!(fp.as_str().len(), FINGERPRINT_PREFIX.len() + 32);
    }

    #[test]
    fn test_fingerprint_ignores_page_size() {
        let a = FeedQuery::news(Some("sports"));
        let mut b = a.clone();
        b.page_size = 10;
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_depends_on_window() {
        let windowed = FeedQuery::news(None);
        let unbounded = FeedQuery::news(None).with_window(None);
        assert_ne!(windowed.fingerprint(), unbounded.fingerprint());
    }

    #[test]
    fn test_all_sentinel_shares_fingerprint_with_unset() {
        assert_eq!(
            FeedQuery::news(Some("all")).fingerprint(),
            FeedQuery::news(None).fingerprint()
        );
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let query = FeedQuery::news(None);
        let items = vec![
            item(1, now() - Duration::hours(48)),
            item(2, now() - Duration::hours(48) - Duration::seconds(1)),
        ];

        let selected = query.apply(items, now());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 1);
    }

    #[test]
    fn test_apply_filters_status_type_and_category() {
        let query = FeedQuery::news(Some("politics"));
        let published = now() - Duration::hours(1);
        let items = vec![
            item(1, published).with_category("politics"),
            item(2, published).with_category("sports"),
            item(3, published).with_category("politics").with_status(PostStatus::Draft),
            item(4, published).with_category("politics").with_post_type("page"),
        ];

        let ids: Vec<u64> = query.apply(items, now()).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_apply_orders_descending_with_id_tiebreak() {
        let query = FeedQuery::news(None);
        let t = now() - Duration::hours(2);
        let items = vec![
            item(1, t),
            item(5, t + Duration::minutes(30)),
            item(3, t),
            item(2, t - Duration::minutes(10)),
        ];

        let ids: Vec<u64> = query.apply(items, now()).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![5, 3, 1, 2]);
    }

    #[test]
    fn test_apply_caps_at_page_size() {
        let query = FeedQuery::news(None);
        let items = (0..1500u64).map(|i| item(i, now() - Duration::seconds(i as i64)));

        let selected = query.apply(items, now());
        assert_eq!(selected.len(), 1000);
        assert_eq!(selected[0].id, 0);
        assert_eq!(selected[999].id, 999);
    }

    proptest! {
        #[test]
        fn prop_fingerprint_deterministic(category in proptest::option::of("[a-z0-9-]{1,20}")) {
            let a = FeedQuery::news(category.as_deref());
            let b = FeedQuery::news(category.as_deref());
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }

        #[test]
        fn prop_fingerprint_differs_by_category(a in "[a-z0-9-]{1,20}", b in "[a-z0-9-]{1,20}") {
            prop_assume!(a != b && a != "all" && b != "all");
            prop_assert_ne!(
                FeedQuery::news(Some(&a)).fingerprint(),
                FeedQuery::news(Some(&b)).fingerprint()
            );
            prop_assert_ne!(
                FeedQuery::news(Some(&a)).fingerprint(),
                FeedQuery::news(None).fingerprint()
            );
        }
    }
}
