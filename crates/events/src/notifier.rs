//! Fan-out of accepted alerts to notification channels.

use std::sync::Arc;

use async_trait::async_trait;
use pumpwatch_core::alert::Alert;

use crate::delivery::email::{EmailConfig, EmailDelivery, EmailError};
use crate::delivery::webhook::{ChatWebhookConfig, WebhookDelivery, WebhookError};

/// A single channel failed to deliver. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("{0}")]
    Other(String),
}

/// An outbound side-channel for accepted alerts.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, alert: &Alert) -> Result<(), NotificationError>;
}

/// Sends each accepted alert to every configured channel.
///
/// Channels are isolated from one another: each is driven on its own and a
/// failure is logged, never propagated.
#[derive(Clone, Default)]
pub struct AlertNotifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl AlertNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Build the channel set from `ENABLE_EMAIL_ALERTS` / `ENABLE_CHAT_ALERTS`
    /// and their settings. Disabled channels are simply absent.
    pub fn from_env() -> Self {
        let mut notifier = Self::new();
        if let Some(config) = EmailConfig::from_env() {
            tracing::info!(host = %config.smtp_host, recipients = config.recipients.len(), "Email alerts enabled");
            notifier = notifier.with_channel(Arc::new(EmailDelivery::new(config)));
        }
        if let Some(config) = ChatWebhookConfig::from_env() {
            tracing::info!("Chat webhook alerts enabled");
            notifier = notifier.with_channel(Arc::new(WebhookDelivery::new(config)));
        }
        notifier
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Fire-and-forget: spawn one task per channel and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, alert: &Alert) {
        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let alert = alert.clone();
            tokio::spawn(async move {
                deliver_logged(channel.as_ref(), &alert).await;
            });
        }
    }

    /// Drive every channel concurrently and wait for all of them.
    ///
    /// Returns each channel's outcome by name; failures are also logged.
    pub async fn notify_all(
        &self,
        alert: &Alert,
    ) -> Vec<(&'static str, Result<(), NotificationError>)> {
        let sends = self.channels.iter().map(|channel| async move {
            let result = deliver_logged(channel.as_ref(), alert).await;
            (channel.name(), result)
        });
        futures::future::join_all(sends).await
    }
}

async fn deliver_logged(
    channel: &dyn NotificationChannel,
    alert: &Alert,
) -> Result<(), NotificationError> {
    let result = channel.send(alert).await;
    if let Err(e) = &result {
        tracing::error!(
            channel = channel.name(),
            alert_id = alert.id,
            device_id = %alert.device_id,
            error = %e,
            "Alert notification failed",
        );
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
