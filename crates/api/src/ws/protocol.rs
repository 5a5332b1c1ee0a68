//! JSON frames exchanged on the live channel.

use axum::extract::ws::Message;
use pumpwatch_core::alert::Alert;
use pumpwatch_core::reading::Reading;
use serde::{Deserialize, Serialize};

use crate::auth::users::LiveUser;

/// Client -> server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "deviceId", default)]
        device_id: Option<String>,
    },
    Unsubscribe {
        #[serde(rename = "deviceId", default)]
        device_id: Option<String>,
    },
    Ping,
    #[serde(other)]
    Unknown,
}

/// Server -> client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        message: String,
        user: LiveUser,
    },
    Subscribed {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
    Unsubscribed {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
    Pong,
    DeviceUpdate {
        #[serde(rename = "deviceId")]
        device_id: String,
        data: Reading,
    },
    Alert {
        alert: Alert,
    },
}

impl ServerMessage {
    pub fn connected(user: &LiveUser) -> Self {
        ServerMessage::Connected {
            message: "WebSocket connection established".to_string(),
            user: user.clone(),
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}
