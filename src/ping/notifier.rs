use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::ping::{PingLogRecord, PingTransport};
use crate::storage::{PingLog, PublicationSettings, SettingsStore};

/// What a publish-event notification ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Pings are switched off in the settings; nothing was sent or logged.
    Disabled,
    Sent { ping_url: String },
    /// The request could not be delivered. The attempt is still logged.
    Failed { ping_url: String, reason: String },
}

/// Tells the search indexer the sitemap changed whenever content is
/// published. At most one attempt per event, no retries, never raises.
#[derive(Clone)]
pub struct PingNotifier {
    transport: Arc<dyn PingTransport>,
    log: Arc<dyn PingLog>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    ping_url: String,
    site_name: String,
}

impl PingNotifier {
    /// `endpoint` is the indexer ping URL; `feed_url` the absolute sitemap
    /// URL passed to it as the `sitemap` query parameter.
    pub fn new(
        transport: Arc<dyn PingTransport>,
        log: Arc<dyn PingLog>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        endpoint: &str,
        feed_url: &str,
        site_name: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            log,
            settings,
            clock,
            ping_url: build_ping_url(endpoint, feed_url)?,
            site_name: site_name.into(),
        })
    }

    pub fn ping_url(&self) -> &str {
        &self.ping_url
    }

    /// Handle the publish event for `content_id`.
    pub async fn notify(&self, content_id: u64) -> NotifyOutcome {
        let settings = PublicationSettings::load(self.settings.as_ref(), &self.site_name).await;
        if !settings.ping_enabled {
            debug!("Ping disabled, skipping notification for content {}", content_id);
            return NotifyOutcome::Disabled;
        }

        let outcome = match self.transport.get(&self.ping_url).await {
            Ok(()) => {
                info!("Pinged indexer for content {}: {}", content_id, self.ping_url);
                NotifyOutcome::Sent {
                    ping_url: self.ping_url.clone(),
                }
            }
            Err(e) => {
                warn!("Ping for content {} failed: {}", content_id, e);
                NotifyOutcome::Failed {
                    ping_url: self.ping_url.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let record = PingLogRecord::new(self.clock.now(), self.ping_url.clone());
        if let Err(e) = self.log.append(&record.to_line()).await {
            warn!("Failed to write ping log: {}", e);
        }

        outcome
    }

    /// Run `notify` on the runtime so the publishing caller never waits on
    /// the indexer.
    pub fn spawn_notify(&self, content_id: u64) -> JoinHandle<NotifyOutcome> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.notify(content_id).await })
    }
}

/// `<endpoint>?sitemap=<form-encoded feed url>`
pub fn build_ping_url(endpoint: &str, feed_url: &str) -> Result<String> {
    let url = url::Url::parse_with_params(endpoint, &[("sitemap", feed_url)])
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", endpoint, e)))?;
    Ok(url.to_string())
}
