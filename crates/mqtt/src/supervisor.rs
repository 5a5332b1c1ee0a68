//! The connection task: poll -> hand off -> reconnect.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::client::{InboundMessage, SharedStatus};
use crate::link::{BrokerLink, LinkEvent};
use crate::reconnect::ReconnectPolicy;

/// Drive one broker link until cancelled or the reconnect budget is spent.
///
/// Messages go to `inbound` with `try_send`, so a slow handler never stalls
/// polling or reconnection; overflow is dropped with a warning.
pub(crate) async fn run_connection_loop<L: BrokerLink>(
    mut link: L,
    filter: String,
    policy: ReconnectPolicy,
    status: Arc<SharedStatus>,
    inbound: mpsc::Sender<InboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = link.poll() => event,
        };

        match event {
            Ok(LinkEvent::Connected) => {
                status.connected.store(true, Ordering::SeqCst);
                status.reconnect_attempts.store(0, Ordering::SeqCst);
                tracing::info!(filter = %filter, "Connected to MQTT broker");

                if let Err(e) = link.subscribe(&filter).await {
                    tracing::error!(filter = %filter, error = %e, "MQTT subscribe failed");
                }
            }
            Ok(LinkEvent::Message { topic, payload }) => {
                match inbound.try_send(InboundMessage { topic, payload }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(msg)) => {
                        tracing::warn!(topic = %msg.topic, "Inbound queue full, dropping message");
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::warn!("Message dispatcher stopped, closing MQTT link");
                        break;
                    }
                }
            }
            Ok(LinkEvent::Idle) => {}
            Err(e) => {
                if status.connected.swap(false, Ordering::SeqCst) {
                    tracing::warn!(error = %e, "MQTT connection lost");
                }

                let attempts = status.reconnect_attempts.load(Ordering::SeqCst);
                let Some(attempt) = policy.next_attempt(attempts) else {
                    status.gave_up.store(true, Ordering::SeqCst);
                    tracing::error!(
                        attempts,
                        error = %e,
                        "Giving up on MQTT broker; restart required to reconnect",
                    );
                    break;
                };
                status.reconnect_attempts.store(attempt, Ordering::SeqCst);

                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = policy.delay.as_secs(),
                    error = %e,
                    "MQTT connection failed, retrying",
                );

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(policy.delay) => {}
                }
            }
        }
    }

    status.connected.store(false, Ordering::SeqCst);
    link.close().await;
    tracing::info!("MQTT connection task exited");
}
