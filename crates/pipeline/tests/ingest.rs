//! End-to-end ingestion against the in-memory gateway and a simulated clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use pumpwatch_core::alert::{Alert, AlertDraft, AlertKind, Severity};
use pumpwatch_core::reading::Reading;
use pumpwatch_core::types::{DbId, Timestamp};
use pumpwatch_db::{InMemoryGateway, PersistenceError, PersistenceGateway};
use pumpwatch_events::{AlertNotifier, NotificationChannel, NotificationError};
use pumpwatch_mqtt::MessageHandler;
use pumpwatch_pipeline::{LiveFanOut, ManualClock, Pipeline, PipelineConfig, PipelineError};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingFanOut {
    readings: Mutex<Vec<(String, Reading)>>,
    alerts: Mutex<Vec<Alert>>,
}

#[async_trait]
impl LiveFanOut for RecordingFanOut {
    async fn push_reading(&self, device_id: &str, reading: &Reading) {
        self.readings
            .lock()
            .unwrap()
            .push((device_id.to_string(), reading.clone()));
    }

    async fn push_alert(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

struct CountingChannel {
    fail: bool,
    sent: AtomicUsize,
}

#[async_trait]
impl NotificationChannel for CountingChannel {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn send(&self, _alert: &Alert) -> Result<(), NotificationError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(NotificationError::Other("channel down".into()))
        } else {
            Ok(())
        }
    }
}

/// Holds `upsert_device` for one device until released.
struct StallingGateway {
    inner: InMemoryGateway,
    stalled_device: &'static str,
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

#[async_trait]
impl PersistenceGateway for StallingGateway {
    async fn upsert_device(
        &self,
        device_id: &str,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), PersistenceError> {
        if device_id == self.stalled_device {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.upsert_device(device_id, name, location).await
    }

    async fn append_reading(&self, reading: &Reading) -> Result<DbId, PersistenceError> {
        self.inner.append_reading(reading).await
    }

    async fn append_alert(
        &self,
        draft: &AlertDraft,
        accepted_at: Timestamp,
        cooldown: Duration,
    ) -> Result<Option<Alert>, PersistenceError> {
        self.inner.append_alert(draft, accepted_at, cooldown).await
    }
}

struct Harness {
    pipeline: Arc<Pipeline>,
    gateway: Arc<InMemoryGateway>,
    fanout: Arc<RecordingFanOut>,
    clock: Arc<ManualClock>,
}

fn harness_with(notifier: AlertNotifier) -> Harness {
    let gateway = Arc::new(InMemoryGateway::new());
    let fanout = Arc::new(RecordingFanOut::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
    ));
    let pipeline = Arc::new(Pipeline::new(
        PipelineConfig::default(),
        gateway.clone(),
        notifier,
        fanout.clone(),
        clock.clone(),
    ));
    Harness {
        pipeline,
        gateway,
        fanout,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(AlertNotifier::new())
}

fn bytes(value: serde_json::Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

fn dry_run_overvoltage() -> Vec<u8> {
    bytes(json!({
        "device_id": "D1",
        "vrms_1_r": 500,
        "dry_run_alert": 1,
        "hydrostatic_value": 3.2
    }))
}

fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
    alerts.iter().map(|a| a.kind).collect()
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeat_alerts_are_suppressed_until_cooldown_elapses() {
    let h = harness();

    let first = h.pipeline.ingest(Some("devices/D1/data"), &dry_run_overvoltage()).await.unwrap();
    assert_eq!(first.drafts, 2);
    assert_eq!(
        kinds(&first.accepted),
        vec![AlertKind::DryRun, AlertKind::VoltageOutOfRange]
    );
    assert_eq!(first.accepted[0].severity, Severity::Critical);
    assert_eq!(first.accepted[1].severity, Severity::Warning);
    assert_eq!(first.accepted[1].actual_value, Some(500.0));

    h.clock.advance(Duration::minutes(4));
    let second = h.pipeline.ingest(Some("devices/D1/data"), &dry_run_overvoltage()).await.unwrap();
    assert_eq!(second.drafts, 2);
    assert!(second.accepted.is_empty());

    h.clock.advance(Duration::minutes(2));
    let third = h.pipeline.ingest(Some("devices/D1/data"), &dry_run_overvoltage()).await.unwrap();
    assert_eq!(third.accepted.len(), 2);

    assert_eq!(h.gateway.alerts().len(), 4);
    assert_eq!(h.gateway.readings().len(), 3);
    assert_eq!(h.fanout.readings.lock().unwrap().len(), 3);
    assert_eq!(h.fanout.alerts.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn one_acceptance_per_pair_regardless_of_interleaving() {
    let h = harness();
    let d1 = bytes(json!({"device_id": "D1", "dry_run_alert": 1}));
    let d2 = bytes(json!({"device_id": "D2", "high_level_float_alert": 1}));
    let d1_protection = bytes(json!({"device_id": "D1", "pump_1_protection": 1}));

    for payload in [&d1, &d2, &d1_protection, &d2, &d1, &d1_protection, &d1, &d2] {
        h.pipeline.ingest(None, payload).await.unwrap();
        h.clock.advance(Duration::seconds(30));
    }

    let alerts = h.gateway.alerts();
    let count = |device: &str, kind| {
        alerts
            .iter()
            .filter(|a| a.device_id == device && a.kind == kind)
            .count()
    };
    assert_eq!(count("D1", AlertKind::DryRun), 1);
    assert_eq!(count("D1", AlertKind::Pump1Protection), 1);
    assert_eq!(count("D2", AlertKind::HighWaterLevel), 1);
    assert_eq!(alerts.len(), 3);
}

#[tokio::test]
async fn concurrent_messages_for_one_device_accept_once() {
    let h = harness();
    let payload = Arc::new(bytes(json!({"device_id": "D1", "pump_2_protection": true})));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pipeline = Arc::clone(&h.pipeline);
        let payload = Arc::clone(&payload);
        handles.push(tokio::spawn(async move {
            pipeline.ingest(None, &payload).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap().unwrap().accepted.len();
    }
    assert_eq!(accepted, 1);
    assert_eq!(h.gateway.readings().len(), 10);
}

#[tokio::test]
async fn slow_storage_for_one_device_does_not_hold_up_another() {
    let gateway = Arc::new(StallingGateway {
        inner: InMemoryGateway::new(),
        stalled_device: "D1",
        entered: tokio::sync::Notify::new(),
        release: tokio::sync::Notify::new(),
    });
    let fanout = Arc::new(RecordingFanOut::default());
    let pipeline = Arc::new(Pipeline::new(
        PipelineConfig::default(),
        gateway.clone(),
        AlertNotifier::new(),
        fanout.clone(),
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        )),
    ));

    let stalled = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let payload = bytes(json!({"device_id": "D1", "dry_run_alert": 1}));
            pipeline.ingest(None, &payload).await
        })
    };
    gateway.entered.notified().await;

    let other = bytes(json!({"device_id": "D2", "high_level_float_alert": 1}));
    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        pipeline.ingest(None, &other),
    )
    .await
    .expect("D2 must not wait on D1's storage call")
    .unwrap();
    assert_eq!(kinds(&outcome.accepted), vec![AlertKind::HighWaterLevel]);
    assert!(!stalled.is_finished());
    assert!(gateway.inner.readings().iter().all(|r| r.device_id == "D2"));

    gateway.release.notify_one();
    let outcome = stalled.await.unwrap().unwrap();
    assert_eq!(kinds(&outcome.accepted), vec![AlertKind::DryRun]);
    assert_eq!(gateway.inner.readings().len(), 2);
    assert_eq!(fanout.readings.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn quiet_reading_is_stored_and_pushed_without_alerts() {
    let h = harness();
    let payload = bytes(json!({
        "deviceId": "D7",
        "location": "khusam",
        "data": {"VRMS_1_R": 401.0, "Hydrostatic_Value": 12.5}
    }));

    let outcome = h.pipeline.ingest(Some("devices/D7/data"), &payload).await.unwrap();
    assert_eq!(outcome.drafts, 0);
    assert!(outcome.accepted.is_empty());

    let device = h.gateway.device("D7").unwrap();
    assert_eq!(device.name, "D7");
    assert_eq!(device.location, "khusam");

    let pushed = h.fanout.readings.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].0, "D7");
    assert_eq!(pushed[0].1.water_level, 12.5);
}

#[tokio::test]
async fn topic_mismatch_uses_payload_device() {
    let h = harness();
    let outcome = h
        .pipeline
        .ingest(Some("devices/OTHER/data"), &bytes(json!({"device_id": "D1"})))
        .await
        .unwrap();
    assert_eq!(outcome.device_id, "D1");
    assert!(h.gateway.device("OTHER").is_none());
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_payload_is_dropped_without_side_effects() {
    let h = harness();

    let result = h.pipeline.ingest(None, b"{\"device_id\": ").await;
    assert_matches!(result, Err(PipelineError::Parse(_)));

    let result = h.pipeline.ingest(None, &bytes(json!({"vrms_1_r": 500}))).await;
    assert_matches!(result, Err(PipelineError::Parse(_)));

    assert!(h.gateway.readings().is_empty());
    assert!(h.fanout.readings.lock().unwrap().is_empty());

    // The handler path swallows the error and keeps going.
    h.pipeline.handle("devices/D1/data", b"garbage").await;
    h.pipeline
        .handle("devices/D1/data", &bytes(json!({"device_id": "D1"})))
        .await;
    assert_eq!(h.gateway.readings().len(), 1);
}

#[tokio::test]
async fn reading_storage_is_retried_once() {
    let h = harness();
    h.gateway.fail_next_readings(1);

    let outcome = h.pipeline.ingest(None, &dry_run_overvoltage()).await.unwrap();
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(h.gateway.readings().len(), 1);
}

#[tokio::test]
async fn reading_failing_twice_drops_message_before_evaluation() {
    let h = harness();
    h.gateway.fail_next_readings(2);

    let result = h.pipeline.ingest(None, &dry_run_overvoltage()).await;
    assert_matches!(result, Err(PipelineError::Persistence(_)));
    assert!(h.gateway.alerts().is_empty());
    assert!(h.fanout.readings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn device_upsert_failing_twice_drops_message() {
    let h = harness();
    h.gateway.fail_next_upserts(2);

    let result = h.pipeline.ingest(None, &dry_run_overvoltage()).await;
    assert_matches!(result, Err(PipelineError::Persistence(_)));
    assert!(h.gateway.readings().is_empty());
}

#[tokio::test]
async fn alert_storage_failure_aborts_only_the_alerts() {
    let h = harness();
    h.gateway.set_alerts_unavailable(true);

    let outcome = h.pipeline.ingest(None, &dry_run_overvoltage()).await.unwrap();
    assert_eq!(outcome.drafts, 2);
    assert_eq!(outcome.failed, 2);
    assert!(outcome.accepted.is_empty());
    assert_eq!(h.gateway.readings().len(), 1);
    assert!(h.fanout.alerts.lock().unwrap().is_empty());

    // Nothing was recorded as accepted, so recovery accepts immediately.
    h.gateway.set_alerts_unavailable(false);
    let outcome = h.pipeline.ingest(None, &dry_run_overvoltage()).await.unwrap();
    assert_eq!(outcome.accepted.len(), 2);
}

#[tokio::test]
async fn notification_failure_keeps_the_alert() {
    let failing = Arc::new(CountingChannel {
        fail: true,
        sent: AtomicUsize::new(0),
    });
    let working = Arc::new(CountingChannel {
        fail: false,
        sent: AtomicUsize::new(0),
    });
    let notifier = AlertNotifier::new()
        .with_channel(failing.clone())
        .with_channel(working.clone());
    let h = harness_with(notifier);

    let outcome = h
        .pipeline
        .ingest(None, &bytes(json!({"device_id": "D1", "dry_run_alert": 1})))
        .await
        .unwrap();
    assert_eq!(outcome.accepted.len(), 1);

    for _ in 0..100 {
        if failing.sent.load(Ordering::SeqCst) == 1 && working.sent.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(failing.sent.load(Ordering::SeqCst), 1);
    assert_eq!(working.sent.load(Ordering::SeqCst), 1);
    assert_eq!(h.gateway.alerts().len(), 1);
}
