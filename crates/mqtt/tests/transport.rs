//! Transport client behaviour against scripted broker links.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use pumpwatch_mqtt::{
    BrokerLink, LinkEvent, MessageHandler, MqttConfig, TransportClient, TransportError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A link that replays a script, then fails every poll.
struct ScriptedLink {
    script: VecDeque<Result<LinkEvent, TransportError>>,
    polls: Arc<AtomicUsize>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLink {
    fn new(script: Vec<Result<LinkEvent, TransportError>>) -> Self {
        Self {
            script: script.into(),
            polls: Arc::new(AtomicUsize::new(0)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl BrokerLink for ScriptedLink {
    async fn poll(&mut self) -> Result<LinkEvent, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(next) => next,
            None => Err(TransportError::Disconnected("connection refused".into())),
        }
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.subscriptions.lock().unwrap().push(filter.to_string());
        Ok(())
    }

    async fn close(&mut self) {}
}

/// A link that parks forever after its script.
struct ParkingLink {
    script: VecDeque<LinkEvent>,
}

#[async_trait]
impl BrokerLink for ParkingLink {
    async fn poll(&mut self) -> Result<LinkEvent, TransportError> {
        match self.script.pop_front() {
            Some(event) => Ok(event),
            None => std::future::pending().await,
        }
    }

    async fn subscribe(&mut self, _filter: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) {}
}

#[derive(Default)]
struct Collect {
    seen: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl MessageHandler for Collect {
    async fn handle(&self, topic: &str, payload: &[u8]) {
        self.seen.lock().unwrap().push((topic.to_string(), payload.to_vec()));
    }
}

fn client_with(handler: Arc<Collect>) -> TransportClient {
    let config = MqttConfig::from_url("mqtt://broker.test").unwrap();
    let mut client = TransportClient::new(config);
    client.on_message(handler);
    client
}

fn message(topic: &str, payload: &str) -> LinkEvent {
    LinkEvent::Message {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn gives_up_after_ten_failed_reconnects() {
    let client = client_with(Arc::new(Collect::default()));
    let link = ScriptedLink::new(vec![Ok(LinkEvent::Connected)]);
    let polls = Arc::clone(&link.polls);
    client.start_with_link(link).unwrap();

    // 10 retries at 5s each; paused time auto-advances while idle.
    tokio::time::sleep(Duration::from_secs(120)).await;

    let status = client.status();
    assert!(!status.connected);
    assert_eq!(status.reconnect_attempts, 10);
    assert!(status.gave_up);
    // CONNACK, the drop, 10 reconnect polls.
    assert_eq!(polls.load(Ordering::SeqCst), 12);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 12, "no attempts after giving up");
}

#[tokio::test(start_paused = true)]
async fn successful_reconnect_resets_the_budget() {
    let client = client_with(Arc::new(Collect::default()));
    let link = ScriptedLink::new(vec![
        Ok(LinkEvent::Connected),
        Err(TransportError::Disconnected("reset".into())),
        Err(TransportError::Disconnected("refused".into())),
        Ok(LinkEvent::Connected),
    ]);
    let subscriptions = Arc::clone(&link.subscriptions);
    client.start_with_link(link).unwrap();

    // Two failures (10s of backoff) then a CONNACK.
    tokio::time::sleep(Duration::from_secs(12)).await;
    let subscribed = subscriptions.lock().unwrap().clone();
    assert_eq!(subscribed, vec!["devices/+/data", "devices/+/data"]);

    // The budget restarted from zero after the second CONNACK.
    tokio::time::sleep(Duration::from_secs(120)).await;
    let status = client.status();
    assert!(status.gave_up);
    assert_eq!(status.reconnect_attempts, 10);
}

#[tokio::test(start_paused = true)]
async fn status_reports_connected_while_session_is_up() {
    let client = client_with(Arc::new(Collect::default()));
    client
        .start_with_link(ParkingLink {
            script: VecDeque::from([LinkEvent::Connected]),
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let status = client.status();
    assert!(status.connected);
    assert_eq!(status.reconnect_attempts, 0);

    client.disconnect().await;
    assert!(!client.status().connected);
}

// ---------------------------------------------------------------------------
// Hand-off
// ---------------------------------------------------------------------------

#[tokio::test]
async fn messages_reach_the_handler_unparsed_and_in_order() {
    let handler = Arc::new(Collect::default());
    let client = client_with(Arc::clone(&handler));
    client
        .start_with_link(ParkingLink {
            script: VecDeque::from([
                LinkEvent::Connected,
                message("devices/D1/data", "{\"device_id\":\"D1\"}"),
                LinkEvent::Idle,
                message("devices/D2/data", "not json"),
            ]),
        })
        .unwrap();

    for _ in 0..100 {
        if handler.seen.lock().unwrap().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let seen = handler.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "devices/D1/data");
    assert_eq!(seen[1].1, b"not json".to_vec());

    client.disconnect().await;
}

#[tokio::test]
async fn connect_requires_a_handler() {
    let config = MqttConfig::from_url("mqtt://broker.test").unwrap();
    let client = TransportClient::new(config);
    let result = client.start_with_link(ParkingLink {
        script: VecDeque::new(),
    });
    assert_matches!(result, Err(TransportError::NoHandler));
}

#[tokio::test]
async fn second_start_is_rejected() {
    let client = client_with(Arc::new(Collect::default()));
    let link = || ParkingLink {
        script: VecDeque::new(),
    };
    client.start_with_link(link()).unwrap();
    assert_matches!(client.start_with_link(link()), Err(TransportError::AlreadyStarted));
    client.disconnect().await;
}
