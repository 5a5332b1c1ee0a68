use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::auth::users::LiveUser;
use crate::state::AppState;
use crate::ws::hub::LiveHub;
use crate::ws::protocol::{ClientMessage, ServerMessage};

/// GET /ws -- upgrade an authenticated request to a live session.
///
/// The [`LiveUser`] extractor runs first, so a missing or invalid token is
/// answered with 401 and the upgrade never happens.
pub async fn ws_handler(
    user: LiveUser,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user, state.hub))
}

/// Drive one live session: register, greet, forward queued frames to the
/// socket and apply client messages until the socket closes.
async fn handle_socket(socket: WebSocket, user: LiveUser, hub: Arc<LiveHub>) {
    let session_id = format!("{}_{}", user.id, uuid::Uuid::new_v4());
    tracing::info!(session_id = %session_id, username = %user.username, "Live session connected");

    let mut rx = hub.register_session(session_id.clone(), user.clone()).await;
    hub.send_to_session(&session_id, &ServerMessage::connected(&user))
        .await;

    let (mut sink, mut stream) = socket.split();

    let sender_session_id = session_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(session_id = %sender_session_id, "Live socket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => apply_client_text(&hub, &session_id, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(session_id = %session_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "Live socket receive error");
                break;
            }
        }
    }

    hub.close_session(&session_id).await;
    send_task.abort();
}

async fn apply_client_text(hub: &LiveHub, session_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "Ignoring unparseable live message");
            return;
        }
    };

    let reply = match message {
        ClientMessage::Subscribe {
            device_id: Some(device_id),
        } => {
            hub.subscribe(session_id, &device_id).await;
            ServerMessage::Subscribed { device_id }
        }
        ClientMessage::Unsubscribe {
            device_id: Some(device_id),
        } => {
            hub.unsubscribe(session_id, &device_id).await;
            ServerMessage::Unsubscribed { device_id }
        }
        ClientMessage::Subscribe { device_id: None }
        | ClientMessage::Unsubscribe { device_id: None } => return,
        ClientMessage::Ping => ServerMessage::Pong,
        ClientMessage::Unknown => {
            tracing::warn!(session_id, "Unknown live message type");
            return;
        }
    };

    hub.send_to_session(session_id, &reply).await;
}
