use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::Shell;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use crate::ping::{NotifyOutcome, PingNotifier, ReqwestTransport};
use crate::server;
use crate::sitemap::{FeedService, SiteInfo};
use crate::storage::{FileCacheStore, FilePingLog, FileSettingsStore, JsonFileRepository, PingLog};

/// Write a default configuration file and create the data directories.
pub async fn init(config_path: Option<PathBuf>) -> Result<()> {
    info!("Initializing news-sitemap configuration");

    let config_file = get_config_file(config_path)?;
    if let Some(parent) = config_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = if config_file.exists() {
        warn!("Configuration file already exists: {}", config_file.display());
        Config::load(&config_file)?
    } else {
        let config = Config::default();
        config.save(&config_file)?;
        info!("Created default configuration: {}", config_file.display());
        config
    };

    for dir in [
        config.storage.content_file.parent(),
        config.storage.settings_file.parent(),
        Some(config.storage.cache_dir.as_path()),
        config.storage.ping_log.parent(),
    ]
    .into_iter()
    .flatten()
    {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            debug!("Created directory: {}", dir.display());
        }
    }

    println!("✅ news-sitemap initialized");
    println!("   Config file:  {}", config_file.display());
    println!("   Content file: {}", config.storage.content_file.display());
    println!("   Cache dir:    {}", config.storage.cache_dir.display());
    println!("   Sitemap URL:  {}", config.feed_url());

    Ok(())
}

pub async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let addr = bind
        .parse()
        .map_err(|_| Error::Invalid(format!("Invalid bind address: {}", bind)))?;

    let service = Arc::new(build_service(config));
    server::serve(addr, server::build_router(service)).await
}

/// Print the document the endpoint would return right now.
pub async fn generate(config: &Config) -> Result<()> {
    let document = build_service(config).get().await?;
    println!("{}", document);
    Ok(())
}

pub async fn regenerate(config: &Config, warm: bool) -> Result<()> {
    let service = build_service(config);
    service.regenerate(false).await?;
    println!("🗑️  Sitemap cache cleared ({})", service.fingerprint().await);

    if warm {
        let url = config.feed_url();
        let client = reqwest::Client::builder()
            .timeout(config.ping_timeout())
            .user_agent(config.ping.user_agent.clone())
            .build()
            .map_err(|e| Error::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("Failed to warm {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::HttpError(format!(
                "Warming {} returned HTTP {}",
                url,
                response.status().as_u16()
            )));
        }
        println!("🔥 Cache warmed from {}", url);
    }

    Ok(())
}

pub async fn notify(config: &Config, content_id: u64) -> Result<()> {
    let notifier = build_notifier(config)?;

    match notifier.notify(content_id).await {
        NotifyOutcome::Disabled => println!("⏸️  Pings are disabled in the settings"),
        NotifyOutcome::Sent { ping_url } => println!("📡 Pinged {}", ping_url),
        NotifyOutcome::Failed { ping_url, reason } => {
            println!("⚠️  Ping to {} failed: {}", ping_url, reason)
        }
    }
    Ok(())
}

pub async fn show_ping_log(config: &Config) -> Result<()> {
    let lines = FilePingLog::new(&config.storage.ping_log).read_all().await?;
    if lines.is_empty() {
        println!("📋 Ping log is empty");
        return Ok(());
    }

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub async fn clear_ping_log(config: &Config) -> Result<()> {
    FilePingLog::new(&config.storage.ping_log).clear().await?;
    println!("✅ Ping log cleared");
    Ok(())
}

pub async fn fingerprint(config: &Config) -> Result<()> {
    println!("{}", build_service(config).fingerprint().await);
    Ok(())
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let cmd_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, cmd_name, &mut std::io::stdout());
}

/// Wire the file-backed stores from `config` into a feed service.
pub fn build_service(config: &Config) -> FeedService {
    FeedService::new(
        Arc::new(JsonFileRepository::new(&config.storage.content_file)),
        Arc::new(FileCacheStore::new(&config.storage.cache_dir)),
        Arc::new(FileSettingsStore::new(&config.storage.settings_file)),
        Arc::new(SystemClock),
        SiteInfo::new(config.site.name.clone(), config.site.language.clone()),
    )
    .with_ttl(config.cache_ttl())
}

pub fn build_notifier(config: &Config) -> Result<PingNotifier> {
    let transport = ReqwestTransport::with_timeout(config.ping_timeout())?
        .with_user_agent(config.ping.user_agent.clone());

    PingNotifier::new(
        Arc::new(transport),
        Arc::new(FilePingLog::new(&config.storage.ping_log)),
        Arc::new(FileSettingsStore::new(&config.storage.settings_file)),
        Arc::new(SystemClock),
        &config.ping.endpoint,
        &config.feed_url(),
        config.site.name.clone(),
    )
}

pub fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let config_file = get_config_file(config_path)?;
    Config::load_or_default(config_file)
}

/// Install the tracing subscriber. Logs go to stderr (stdout carries
/// command output) or to `logging.log_file`. Keep the returned guard alive
/// until exit so buffered file output is flushed.
pub fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = if logging.log_to_file {
        let path = resolve_log_file(&logging.log_file)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Config(format!("Invalid log file: {}", logging.log_file)))?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stderr), None)
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug);
    let layer = if logging.json_format {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized");
    Ok(guard)
}

fn resolve_log_file(log_file: &str) -> Result<PathBuf> {
    let path = PathBuf::from(log_file);
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(Config::data_dir()?.join(path))
    }
}

fn get_config_file(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Config::default_config_file(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use chrono::Utc;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.site.name = "Daily Planet".to_string();
        config.site.url = "https://planet.example.com".to_string();
        config.storage.content_file = dir.join("content.json");
        config.storage.settings_file = dir.join("settings.toml");
        config.storage.cache_dir = dir.join("cache");
        config.storage.ping_log = dir.join("ping.log");
        config
    }

    #[tokio::test]
    async fn test_build_service_reads_content_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let items = vec![ContentItem::article(
            1,
            "https://planet.example.com/one",
            "One",
            Utc::now() - chrono::Duration::hours(1),
        )];
        std::fs::write(&config.storage.content_file, serde_json::to_string(&items).unwrap()).unwrap();

        let service = build_service(&config);
        let document = service.get().await.unwrap();
        assert!(document.contains("<loc>https://planet.example.com/one</loc>"));
        assert!(document.contains("<news:name>Daily Planet</news:name>"));
        assert!(config.storage.cache_dir.exists());
    }

    #[test]
    fn test_build_notifier_uses_feed_url() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let notifier = build_notifier(&config).unwrap();
        assert_eq!(
            notifier.ping_url(),
            "http://www.google.com/ping?sitemap=https%3A%2F%2Fplanet.example.com%2Fnewsfeed.xml"
        );
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let config = config_in(temp_dir.path());
        config.save(&config_file).unwrap();

        init(Some(config_file.clone())).await.unwrap();

        assert_eq!(Config::load(&config_file).unwrap().site.name, "Daily Planet");
        assert!(config.storage.cache_dir.exists());
    }

    #[test]
    fn test_generate_completions() {
        generate_completions(Shell::Bash);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(Some(temp_dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.cache.ttl_secs, 3600);
    }
}
