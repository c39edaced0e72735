pub mod cache;
pub mod encoder;
pub mod query;
pub mod selector;
pub mod service;

pub use cache::{FeedCache, DEFAULT_TTL};
pub use encoder::{FeedEncoder, NEWS_NS, SITEMAP_NS};
pub use query::{
    FeedOrder, FeedQuery, Fingerprint, ALL_CATEGORIES, FINGERPRINT_PREFIX, PAGE_SIZE,
    RECENCY_WINDOW_HOURS,
};
pub use selector::ContentSelector;
pub use service::{FeedService, SiteInfo};

/// Path the sitemap is served from.
pub const FEED_PATH: &str = "/newsfeed.xml";

/// Absolute URL of the sitemap for a site rooted at `site_url`.
pub fn feed_url(site_url: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), FEED_PATH)
}
