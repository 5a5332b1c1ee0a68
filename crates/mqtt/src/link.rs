//! The broker session seam.

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::error::TransportError;

/// Request queue depth between [`AsyncClient`] and its event loop.
const REQUEST_CHANNEL_CAPACITY: usize = 16;

/// What a single poll of the broker session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The broker accepted the session (CONNACK).
    Connected,
    /// An application message arrived.
    Message { topic: String, payload: Vec<u8> },
    /// Protocol traffic with nothing for the application.
    Idle,
}

/// One broker session. Polling after an error re-establishes the connection.
#[async_trait]
pub trait BrokerLink: Send {
    async fn poll(&mut self) -> Result<LinkEvent, TransportError>;

    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError>;

    async fn close(&mut self);
}

/// [`BrokerLink`] over a `rumqttc` client and event loop.
pub struct RumqttLink {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl RumqttLink {
    pub fn new(options: MqttOptions) -> Self {
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        Self { client, eventloop }
    }
}

#[async_trait]
impl BrokerLink for RumqttLink {
    async fn poll(&mut self) -> Result<LinkEvent, TransportError> {
        match self.eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(_)) => Ok(LinkEvent::Connected),
            Event::Incoming(Packet::Publish(publish)) => Ok(LinkEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            }),
            _ => Ok(LinkEvent::Idle),
        }
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.client.subscribe(filter, QoS::AtLeastOnce).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(error = %e, "MQTT disconnect request not queued");
        }
    }
}
