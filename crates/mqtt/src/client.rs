//! The transport client handle.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::MqttConfig;
use crate::error::TransportError;
use crate::link::{BrokerLink, RumqttLink};
use crate::supervisor::run_connection_loop;

/// Receives every inbound message, one at a time, in arrival order.
///
/// Payloads are raw bytes; parsing is the handler's concern.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, topic: &str, payload: &[u8]);
}

/// Snapshot of the broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportStatus {
    pub connected: bool,
    pub reconnect_attempts: u32,
    /// The reconnect budget was spent; only a restart reconnects.
    pub gave_up: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SharedStatus {
    pub(crate) connected: AtomicBool,
    pub(crate) reconnect_attempts: AtomicU32,
    pub(crate) gave_up: AtomicBool,
}

#[derive(Debug)]
pub(crate) struct InboundMessage {
    pub(crate) topic: String,
    pub(crate) payload: Vec<u8>,
}

/// Long-lived MQTT client.
///
/// Register a handler with [`on_message`](Self::on_message), then call
/// [`connect`](Self::connect) once. Background tasks run until
/// [`disconnect`](Self::disconnect) or until reconnection gives up.
pub struct TransportClient {
    config: MqttConfig,
    handler: Option<Arc<dyn MessageHandler>>,
    status: Arc<SharedStatus>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TransportClient {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            handler: None,
            status: Arc::new(SharedStatus::default()),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Register the handler that receives inbound messages.
    pub fn on_message(&mut self, handler: Arc<dyn MessageHandler>) {
        self.handler = Some(handler);
    }

    /// Open the broker session in the background.
    ///
    /// Fails fast on bad options or unreadable TLS material; network
    /// failures are handled by the reconnect loop instead.
    pub fn connect(&self) -> Result<(), TransportError> {
        let options = self.config.mqtt_options()?;
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            tls = self.config.use_tls,
            client_id = %self.config.client_id,
            "Connecting to MQTT broker",
        );
        self.start_with_link(RumqttLink::new(options))
    }

    /// Start the connection and dispatch tasks over an arbitrary link.
    pub fn start_with_link<L>(&self, link: L) -> Result<(), TransportError>
    where
        L: BrokerLink + 'static,
    {
        let handler = self.handler.clone().ok_or(TransportError::NoHandler)?;
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            return Err(TransportError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(self.config.inbound_capacity.max(1));

        tasks.push(tokio::spawn(run_connection_loop(
            link,
            self.config.topic.clone(),
            self.config.reconnect,
            Arc::clone(&self.status),
            tx,
            self.cancel.child_token(),
        )));
        tasks.push(tokio::spawn(dispatch_messages(
            rx,
            handler,
            self.cancel.child_token(),
        )));
        Ok(())
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus {
            connected: self.status.connected.load(Ordering::SeqCst),
            reconnect_attempts: self.status.reconnect_attempts.load(Ordering::SeqCst),
            gave_up: self.status.gave_up.load(Ordering::SeqCst),
        }
    }

    /// Stop the background tasks, waiting up to 5 seconds for each.
    pub async fn disconnect(&self) {
        tracing::info!("Disconnecting MQTT transport");
        self.cancel.cancel();

        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), task).await;
        }
        self.status.connected.store(false, Ordering::SeqCst);
    }
}

/// Hand queued messages to the handler sequentially.
async fn dispatch_messages(
    mut rx: mpsc::Receiver<InboundMessage>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            msg = rx.recv() => msg,
        };
        match msg {
            Some(InboundMessage { topic, payload }) => handler.handle(&topic, &payload).await,
            None => break,
        }
    }
}
