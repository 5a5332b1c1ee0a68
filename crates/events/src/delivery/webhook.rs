//! Chat webhook delivery with exponential-backoff retry.
//!
//! [`WebhookDelivery`] posts a Markdown alert message as
//! `{"chat_id", "text", "parse_mode"}` JSON to a chat bot endpoint. Failed
//! attempts are retried up to three times with exponential backoff
//! (1 s, 2 s, 4 s).

use std::time::Duration;

use async_trait::async_trait;
use pumpwatch_core::alert::Alert;

use crate::message;
use crate::notifier::{NotificationChannel, NotificationError};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// ChatWebhookConfig
// ---------------------------------------------------------------------------

/// Where chat alerts are posted.
#[derive(Debug, Clone)]
pub struct ChatWebhookConfig {
    /// Full endpoint URL, e.g. `https://api.telegram.org/bot<token>/sendMessage`.
    pub url: String,
    /// Target chat, passed through as `chat_id`.
    pub chat_id: Option<String>,
}

impl ChatWebhookConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless chat alerts are enabled and a URL is set.
    ///
    /// | Variable             | Required | Default |
    /// |----------------------|----------|---------|
    /// | `ENABLE_CHAT_ALERTS` | yes      | `false` |
    /// | `CHAT_WEBHOOK_URL`   | yes      | -       |
    /// | `CHAT_ID`            | no       | -       |
    pub fn from_env() -> Option<Self> {
        if std::env::var("ENABLE_CHAT_ALERTS").ok().as_deref() != Some("true") {
            return None;
        }
        let url = std::env::var("CHAT_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        Some(Self {
            url,
            chat_id: std::env::var("CHAT_ID").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers alerts to a chat webhook endpoint.
pub struct WebhookDelivery {
    client: reqwest::Client,
    config: ChatWebhookConfig,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    /// Create a new delivery service with a pre-configured HTTP client.
    pub fn new(config: ChatWebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            config,
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        }
    }

    /// Override the backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// JSON body posted for `alert`.
    pub fn payload(&self, alert: &Alert) -> serde_json::Value {
        serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": message::chat_markdown(alert),
            "parse_mode": "Markdown",
        })
    }

    /// Deliver an alert with retry.
    ///
    /// Retries once per configured backoff delay before giving up.
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, alert: &Alert) -> Result<(), WebhookError> {
        let payload = self.payload(alert);
        let url = self.config.url.as_str();

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        alert_id = alert.id,
                        error = %e,
                        "Chat webhook attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(url, &payload).await.inspect_err(|e| {
            tracing::error!(alert_id = alert.id, error = %e, "Chat webhook failed after all retries");
        })
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for WebhookDelivery {
    fn name(&self) -> &'static str {
        "chat_webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotificationError> {
        self.deliver(alert).await?;
        tracing::info!(alert_id = alert.id, alert_type = %alert.kind, "Chat alert sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
