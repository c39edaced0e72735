use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::error::{Error, Result};
use crate::storage::traits::SettingsStore;

pub const PUBLICATION_NAME_KEY: &str = "news_sitemap_publication_name";
pub const ENABLE_PING_KEY: &str = "news_sitemap_enable_ping";
pub const CATEGORY_FILTER_KEY: &str = "news_sitemap_category_filter";

/// Publication-level settings, read fresh for every generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationSettings {
    pub publication_name: String,
    pub ping_enabled: bool,
    pub category_filter: Option<String>,
}

impl PublicationSettings {
    pub fn defaults(site_name: &str) -> Self {
        Self {
            publication_name: site_name.to_string(),
            ping_enabled: true,
            category_filter: None,
        }
    }

    /// Read every key from `store`. A key that cannot be read keeps its
    /// default and the failure is logged.
    pub async fn load(store: &dyn SettingsStore, site_name: &str) -> Self {
        let mut settings = Self::defaults(site_name);

        if let Some(name) = read_key(store, PUBLICATION_NAME_KEY).await {
            let name = name.trim();
            if !name.is_empty() {
                settings.publication_name = name.to_string();
            }
        }

        if let Some(raw) = read_key(store, ENABLE_PING_KEY).await {
            settings.ping_enabled = parse_bool(&raw).unwrap_or_else(|| {
                warn!("Unrecognised value for {}: {:?}, keeping default", ENABLE_PING_KEY, raw);
                true
            });
        }

        settings.category_filter = read_key(store, CATEGORY_FILTER_KEY)
            .await
            .map(|slug| slug.trim().to_string())
            .filter(|slug| !slug.is_empty());

        settings
    }
}

async fn read_key(store: &dyn SettingsStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read setting {}: {}", key, e);
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// In-memory settings store
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }
}

/// Settings kept in a flat TOML table, re-read on every lookup so edits
/// apply without a restart. A missing file means every key is unset.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Settings(format!(
                    "Failed to read settings file '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| Error::Settings(format!("Invalid settings file '{}': {}", self.path.display(), e)))?;

        Ok(table.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingStore;

    #[async_trait]
    impl SettingsStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Settings("backend unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let store = MemorySettingsStore::new();
        let settings = PublicationSettings::load(&store, "Daily Planet").await;

        assert_eq!(settings, PublicationSettings::defaults("Daily Planet"));
        assert!(settings.ping_enabled);
        assert!(settings.category_filter.is_none());
    }

    #[tokio::test]
    async fn test_load_from_memory_store() {
        let store = MemorySettingsStore::new();
        store.set(PUBLICATION_NAME_KEY, "The Planet");
        store.set(ENABLE_PING_KEY, "0");
        store.set(CATEGORY_FILTER_KEY, "politics");

        let settings = PublicationSettings::load(&store, "Daily Planet").await;
        assert_eq!(settings.publication_name, "The Planet");
        assert!(!settings.ping_enabled);
        assert_eq!(settings.category_filter.as_deref(), Some("politics"));
    }

    #[tokio::test]
    async fn test_blank_publication_name_falls_back_to_site_name() {
        let store = MemorySettingsStore::new();
        store.set(PUBLICATION_NAME_KEY, "  ");

        let settings = PublicationSettings::load(&store, "Daily Planet").await;
        assert_eq!(settings.publication_name, "Daily Planet");
    }

    #[tokio::test]
    async fn test_store_failure_uses_defaults() {
        let settings = PublicationSettings::load(&FailingStore, "Daily Planet").await;
        assert_eq!(settings, PublicationSettings::defaults("Daily Planet"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[tokio::test]
    async fn test_file_store_reads_fresh_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        let store = FileSettingsStore::new(&path);

        assert_eq!(store.get(ENABLE_PING_KEY).await.unwrap(), None);

        std::fs::write(
            &path,
            "news_sitemap_publication_name = \"Planet\"\nnews_sitemap_enable_ping = false\n",
        )
        .unwrap();
        assert_eq!(store.get(PUBLICATION_NAME_KEY).await.unwrap().as_deref(), Some("Planet"));
        assert_eq!(store.get(ENABLE_PING_KEY).await.unwrap().as_deref(), Some("false"));

        std::fs::write(&path, "news_sitemap_category_filter = \"sports\"\n").unwrap();
        let settings = PublicationSettings::load(&store, "Site").await;
        assert_eq!(settings.category_filter.as_deref(), Some("sports"));
        assert!(settings.ping_enabled);
    }

    #[tokio::test]
    async fn test_file_store_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "= nope").unwrap();

        let result = FileSettingsStore::new(&path).get(ENABLE_PING_KEY).await;
        assert!(matches!(result, Err(Error::Settings(_))));
    }
}
