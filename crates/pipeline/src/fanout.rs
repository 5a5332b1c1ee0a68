use async_trait::async_trait;
use pumpwatch_core::alert::Alert;
use pumpwatch_core::reading::Reading;

/// Live delivery to subscribed sessions.
///
/// Implementations must not block on slow consumers.
#[async_trait]
pub trait LiveFanOut: Send + Sync {
    async fn push_reading(&self, device_id: &str, reading: &Reading);

    async fn push_alert(&self, alert: &Alert);
}
