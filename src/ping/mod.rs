pub mod notifier;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, Result};

pub use notifier::{NotifyOutcome, PingNotifier};

/// Indexer endpoint notified when new content is published.
pub const DEFAULT_PING_ENDPOINT: &str = "http://www.google.com/ping";

/// One ping attempt as written to the ping log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingLogRecord {
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

impl PingLogRecord {
    pub fn new(timestamp: DateTime<Utc>, url: impl Into<String>) -> Self {
        Self {
            timestamp,
            url: url.into(),
        }
    }

    /// `2024-03-15 10:00:00 - Pinged Google News: <url>`, UTC.
    pub fn to_line(&self) -> String {
        format!(
            "{} - Pinged Google News: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.url
        )
    }
}

/// Outbound side of a ping: issue a GET and forget about the answer.
#[async_trait]
pub trait PingTransport: Send + Sync {
    /// Succeeds once the endpoint answered with any status; only transport
    /// failures are errors.
    async fn get(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_duration: Duration,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_duration: timeout,
            user_agent: format!("news-sitemap/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_duration
    }
}

#[async_trait]
impl PingTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Notification(format!("Request to {} timed out", url))
                } else {
                    Error::Notification(format!("Request failed: {}", e))
                }
            })?;

        debug!("Ping to {} answered with HTTP {}", url, response.status().as_u16());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_log_line_format() {
        let record = PingLogRecord::new(
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 5, 7).unwrap(),
            "http://www.google.com/ping?sitemap=x",
        );
        assert_eq!(
            record.to_line(),
            "2024-03-15 09:05:07 - Pinged Google News: http://www.google.com/ping?sitemap=x"
        );
    }

    #[tokio::test]
    async fn test_transport_ignores_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let result = transport.get(&format!("{}/ping", mock_server.uri())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_transport_timeout_is_notification_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let transport = ReqwestTransport::with_timeout(Duration::from_millis(100)).unwrap();
        let result = transport.get(&format!("{}/slow", mock_server.uri())).await;

        if let Err(Error::Notification(msg)) = result {
            assert!(msg.contains("timed out"));
        } else {
            panic!("Expected Notification error");
        }
    }

    #[tokio::test]
    async fn test_transport_unreachable_host() {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let result = transport.get("http://127.0.0.1:1/ping").await;
        assert!(matches!(result, Err(Error::Notification(_))));
    }
}
