use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post type the news sitemap publishes.
pub const ARTICLE_POST_TYPE: &str = "article";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Published,
    Private,
    Trashed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
            PostStatus::Private => "private",
            PostStatus::Trashed => "trashed",
        }
    }
}

/// Read-only snapshot of one piece of content as the repository returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
    /// Keyword tags, in the order the repository returns them.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category slugs.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default = "default_status")]
    pub status: PostStatus,
}

fn default_post_type() -> String {
    ARTICLE_POST_TYPE.to_string()
}

fn default_status() -> PostStatus {
    PostStatus::Published
}

impl ContentItem {
    /// Published article with no author, tags or categories.
    pub fn article(id: u64, url: impl Into<String>, title: impl Into<String>, published: DateTime<Utc>) -> Self {
        Self {
            id,
            url: url.into(),
            title: title.into(),
            published,
            modified: None,
            author: None,
            tags: Vec::new(),
            categories: Vec::new(),
            post_type: default_post_type(),
            status: PostStatus::Published,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, slug: impl Into<String>) -> Self {
        self.categories.push(slug.into());
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_post_type(mut self, post_type: impl Into<String>) -> Self {
        self.post_type = post_type.into();
        self
    }

    /// Last-modified time, falling back to the publication time.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.modified.unwrap_or(self.published)
    }

    /// Author name if present and not blank.
    pub fn author_name(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn in_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c == slug)
    }
}
