use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use pumpwatch_core::alert::Alert;
use pumpwatch_core::reading::Reading;
use pumpwatch_core::types::Timestamp;
use pumpwatch_pipeline::LiveFanOut;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::auth::users::LiveUser;
use crate::ws::protocol::ServerMessage;

/// Receiving half of a session's outbound queue, drained by the socket task.
pub type SessionReceiver = mpsc::Receiver<Message>;

/// Result of one [`LiveHub::ping_all`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingSweep {
    pub queued: usize,
    /// Sessions whose queue was full or already closed.
    pub dropped: usize,
}

/// One authenticated live connection.
struct LiveSession {
    user: LiveUser,
    sender: mpsc::Sender<Message>,
    devices: HashSet<String>,
    connected_at: Timestamp,
}

/// Registry of live sessions and their device subscriptions.
///
/// Every outbound frame goes through a bounded per-session queue with
/// `try_send`, so a stalled client loses frames instead of blocking pushes to
/// everyone else. Designed to be wrapped in `Arc` and shared.
pub struct LiveHub {
    sessions: RwLock<HashMap<String, LiveSession>>,
    queue_capacity: usize,
}

impl LiveHub {
    /// `queue_capacity` is clamped to at least 1.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a session and return the receiver for its outbound frames.
    ///
    /// The session starts with no subscriptions. Re-registering an id
    /// replaces the previous session.
    pub async fn register_session(&self, session_id: String, user: LiveUser) -> SessionReceiver {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let session = LiveSession {
            user,
            sender: tx,
            devices: HashSet::new(),
            connected_at: chrono::Utc::now(),
        };
        self.sessions.write().await.insert(session_id, session);
        rx
    }

    /// Add `device_id` to the session's subscriptions. Returns `false` for an
    /// unknown session.
    pub async fn subscribe(&self, session_id: &str, device_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        session.devices.insert(device_id.to_string());
        tracing::info!(
            session_id,
            username = %session.user.username,
            device_id,
            "Live session subscribed",
        );
        true
    }

    /// Remove `device_id` from the session's subscriptions. Returns `false`
    /// for an unknown session.
    pub async fn unsubscribe(&self, session_id: &str, device_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        session.devices.remove(device_id);
        tracing::info!(
            session_id,
            username = %session.user.username,
            device_id,
            "Live session unsubscribed",
        );
        true
    }

    /// Drop a session and its subscriptions. Unknown ids are a no-op.
    pub async fn close_session(&self, session_id: &str) {
        if let Some(session) = self.sessions.write().await.remove(session_id) {
            let connected_secs = (chrono::Utc::now() - session.connected_at).num_seconds();
            tracing::info!(
                session_id,
                username = %session.user.username,
                connected_secs,
                "Live session closed",
            );
        }
    }

    /// Queue a frame for one session. Returns `false` if it was not queued.
    pub async fn send_to_session(&self, session_id: &str, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) => offer(session_id, session, frame),
            None => false,
        }
    }

    /// Push a `device_update` to the sessions subscribed to `device_id`.
    pub async fn push_reading(&self, device_id: &str, reading: &Reading) {
        let message = ServerMessage::DeviceUpdate {
            device_id: device_id.to_string(),
            data: reading.clone(),
        };
        self.push_to_subscribers(device_id, &message).await;
    }

    /// Push an `alert` to the sessions subscribed to the alert's device.
    pub async fn push_alert(&self, alert: &Alert) {
        let message = ServerMessage::Alert {
            alert: alert.clone(),
        };
        self.push_to_subscribers(&alert.device_id, &message).await;
    }

    /// Returns the number of delivered frames.
    async fn push_to_subscribers(&self, device_id: &str, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, session)| session.devices.contains(device_id))
            .filter(|(id, session)| offer(id, session, frame.clone()))
            .count()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of sessions currently subscribed to `device_id`.
    pub async fn subscriber_count(&self, device_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.devices.contains(device_id))
            .count()
    }

    /// Send a Close frame to every session and clear the registry.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        for (id, session) in sessions.iter() {
            if session.sender.try_send(Message::Close(None)).is_err() {
                tracing::debug!(session_id = %id, "Close frame not queued");
            }
        }
        sessions.clear();
    }

    /// Queue a Ping frame for every session.
    pub async fn ping_all(&self) -> PingSweep {
        let sessions = self.sessions.read().await;
        let mut sweep = PingSweep::default();
        for (id, session) in sessions.iter() {
            if offer(id, session, Message::Ping(Bytes::new())) {
                sweep.queued += 1;
            } else {
                sweep.dropped += 1;
            }
        }
        sweep
    }
}

#[async_trait]
impl LiveFanOut for LiveHub {
    async fn push_reading(&self, device_id: &str, reading: &Reading) {
        LiveHub::push_reading(self, device_id, reading).await;
    }

    async fn push_alert(&self, alert: &Alert) {
        LiveHub::push_alert(self, alert).await;
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match message.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode live frame");
            None
        }
    }
}

/// Non-blocking enqueue. A full queue drops the frame; a closed one means
/// the socket task is already tearing the session down.
fn offer(session_id: &str, session: &LiveSession, frame: Message) -> bool {
    match session.sender.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                session_id,
                username = %session.user.username,
                "Live session queue full, dropping frame",
            );
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
