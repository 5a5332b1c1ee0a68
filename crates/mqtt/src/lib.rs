//! MQTT transport client for device telemetry.
//!
//! [`TransportClient`] keeps one long-lived broker session, subscribes to
//! the device data topic, and hands every inbound message, unparsed, to the
//! registered [`MessageHandler`]. Connection loss is retried on a fixed
//! delay up to a bounded number of attempts (see [`ReconnectPolicy`]).
//!
//! The broker is reached through the [`BrokerLink`] seam; [`RumqttLink`]
//! is the production implementation on `rumqttc`.

pub mod client;
pub mod config;
pub mod error;
pub mod link;
pub mod reconnect;
mod supervisor;

pub use client::{MessageHandler, TransportClient, TransportStatus};
pub use config::MqttConfig;
pub use error::TransportError;
pub use link::{BrokerLink, LinkEvent, RumqttLink};
pub use reconnect::ReconnectPolicy;
