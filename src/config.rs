use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::ping::DEFAULT_PING_ENDPOINT;

/// Upper bound for `cache.ttl_secs` (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Default publication name.
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Public root URL; the sitemap lives at `<url>/newsfeed.xml`.
    #[serde(default = "default_site_url")]
    pub url: String,

    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON array of content items exported by the host platform
    #[serde(default = "default_content_file")]
    pub content_file: PathBuf,

    /// Flat TOML table holding the publication settings
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_ping_log")]
    pub ping_log: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingConfig {
    #[serde(default = "default_ping_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::NotFound(path.as_ref().display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults. Env
    /// overrides apply either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.site.url)
            .map_err(|_| ConfigError::InvalidUrl(self.site.url.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL must use http or https: {}",
                self.site.url
            )));
        }

        url::Url::parse(&self.ping.endpoint)
            .map_err(|_| ConfigError::InvalidUrl(self.ping.endpoint.clone()))?;

        if self.site.name.trim().is_empty() {
            return Err(ConfigError::Invalid("Site name cannot be empty".to_string()));
        }

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid("Cache TTL must be greater than 0".to_string()));
        }

        if self.cache.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "Cache TTL must be at most {} seconds",
                MAX_TTL_SECS
            )));
        }

        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("Invalid bind address: {}", self.server.bind)))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("NEWS_SITEMAP_BIND") {
            self.server.bind = bind;
        }

        if let Ok(url) = std::env::var("NEWS_SITEMAP_SITE_URL") {
            self.site.url = url;
        }

        if let Ok(level) = std::env::var("NEWS_SITEMAP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(ttl) = std::env::var("NEWS_SITEMAP_CACHE_TTL") {
            if let Ok(val) = ttl.parse() {
                self.cache.ttl_secs = val;
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping.timeout_secs)
    }

    pub fn feed_url(&self) -> String {
        crate::sitemap::feed_url(&self.site.url)
    }

    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("news-sitemap"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("news-sitemap"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine data directory".to_string()))
    }

    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            cache: CacheSettings::default(),
            ping: PingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            url: default_site_url(),
            language: default_language(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_file: default_content_file(),
            settings_file: default_settings_file(),
            cache_dir: default_cache_dir(),
            ping_log: default_ping_log(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: default_ttl_secs() }
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ping_endpoint(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            log_file: default_log_file(),
            json_format: false,
        }
    }
}

fn data_path(name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("news-sitemap")
        .join(name)
}

fn default_site_name() -> String { "News".to_string() }
fn default_site_url() -> String { "http://localhost:8080".to_string() }
fn default_language() -> String { "en".to_string() }
fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_content_file() -> PathBuf { data_path("content.json") }
fn default_settings_file() -> PathBuf { data_path("settings.toml") }
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("news-sitemap")
}
fn default_ping_log() -> PathBuf { data_path("news-sitemap-ping.log") }
fn default_ttl_secs() -> u64 { 3600 }
fn default_ping_endpoint() -> String { DEFAULT_PING_ENDPOINT.to_string() }
fn default_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    format!("news-sitemap/{}", env!("CARGO_PKG_VERSION"))
}
fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> String { "logs/news-sitemap.log".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.ping.endpoint, "http://www.google.com/ping");
        assert_eq!(config.feed_url(), "http://localhost:8080/newsfeed.xml");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [site]
            name = "Daily Planet"
            url = "https://planet.example.com/"
            "#,
        )
        .unwrap();

        assert_eq!(config.site.name, "Daily Planet");
        assert_eq!(config.site.language, "en");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.feed_url(), "https://planet.example.com/newsfeed.xml");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.site.url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidUrl(_))));

        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        let mut config = Config::default();
        config.cache.ttl_secs = 10_000_000_000_000;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        let mut config = Config::default();
        config.cache.ttl_secs = MAX_TTL_SECS;
        config.validate().unwrap();

        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.site.name = "Planet".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.site.name, "Planet");
        assert_eq!(loaded.storage.content_file, config.storage.content_file);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/news-sitemap.toml");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
