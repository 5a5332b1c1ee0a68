//! Transport message -> stored reading -> live push -> alerts.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use pumpwatch_core::alert::Alert;
use pumpwatch_core::evaluator::AlertEvaluator;
use pumpwatch_core::normalize::normalize_at;
use pumpwatch_core::topic::device_id_from_topic;
use pumpwatch_core::types::DbId;
use pumpwatch_db::{PersistenceError, PersistenceGateway};
use pumpwatch_events::AlertNotifier;
use pumpwatch_mqtt::MessageHandler;

use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::dedup::AlertDeduplicator;
use crate::error::PipelineError;
use crate::fanout::LiveFanOut;
use crate::locks::DeviceLocks;

/// What one ingested message produced.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub device_id: String,
    pub reading_id: DbId,
    /// Drafts the evaluator produced.
    pub drafts: usize,
    /// Drafts accepted past de-duplication, in evaluation order.
    pub accepted: Vec<Alert>,
    /// Drafts dropped because storage failed during the de-dup check.
    pub failed: usize,
}

/// The ingestion pipeline. One instance per process.
pub struct Pipeline {
    evaluator: AlertEvaluator,
    gateway: Arc<dyn PersistenceGateway>,
    dedup: AlertDeduplicator,
    fanout: Arc<dyn LiveFanOut>,
    clock: Arc<dyn Clock>,
    locks: DeviceLocks,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        gateway: Arc<dyn PersistenceGateway>,
        notifier: AlertNotifier,
        fanout: Arc<dyn LiveFanOut>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dedup = AlertDeduplicator::new(
            Arc::clone(&gateway),
            notifier,
            Arc::clone(&clock),
            config.alert_cooldown,
        );
        Self {
            evaluator: AlertEvaluator::new(config.voltage),
            gateway,
            dedup,
            fanout,
            clock,
            locks: DeviceLocks::new(),
        }
    }

    /// Process one raw payload end to end.
    ///
    /// `topic`, when given, is cross-checked against the payload's device
    /// id; the payload wins on mismatch. Device upsert and reading append
    /// are each tried twice before the message is dropped, so no alert is
    /// ever evaluated for an unstored reading.
    pub async fn ingest(
        &self,
        topic: Option<&str>,
        payload: &[u8],
    ) -> Result<IngestOutcome, PipelineError> {
        let reading = normalize_at(payload, self.clock.now())?;
        let device_id = reading.device_id.clone();

        if let Some(topic_device) = topic.and_then(device_id_from_topic) {
            if topic_device != device_id {
                tracing::warn!(
                    topic = topic.unwrap_or_default(),
                    topic_device,
                    device_id = %device_id,
                    "Topic device id does not match payload; using payload",
                );
            }
        }

        let _guard = self.locks.acquire(&device_id).await;

        retry_once("upsert_device", &device_id, || {
            self.gateway.upsert_device(
                &device_id,
                reading.device_name.as_deref(),
                reading.location.as_deref(),
            )
        })
        .await?;

        let reading_id = retry_once("append_reading", &device_id, || {
            self.gateway.append_reading(&reading)
        })
        .await?;

        self.fanout.push_reading(&device_id, &reading).await;

        let drafts = self.evaluator.evaluate(&reading);
        let mut outcome = IngestOutcome {
            device_id: device_id.clone(),
            reading_id,
            drafts: drafts.len(),
            accepted: Vec::new(),
            failed: 0,
        };

        for draft in &drafts {
            match self.dedup.process(draft).await {
                Ok(Some(alert)) => {
                    self.fanout.push_alert(&alert).await;
                    outcome.accepted.push(alert);
                }
                Ok(None) => {}
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(
                        device_id = %device_id,
                        alert_type = %draft.kind,
                        error = %e,
                        "Dropping alert draft after de-dup check failed",
                    );
                }
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl MessageHandler for Pipeline {
    async fn handle(&self, topic: &str, payload: &[u8]) {
        match self.ingest(Some(topic), payload).await {
            Ok(outcome) => tracing::debug!(
                topic,
                device_id = %outcome.device_id,
                reading_id = outcome.reading_id,
                drafts = outcome.drafts,
                accepted = outcome.accepted.len(),
                "Reading ingested",
            ),
            Err(PipelineError::Parse(e)) => tracing::warn!(
                topic,
                bytes = payload.len(),
                error = %e,
                "Dropping malformed payload",
            ),
            Err(e) => tracing::error!(topic, error = %e, "Dropping message"),
        }
    }
}

/// Run a storage call, retrying once on failure.
async fn retry_once<T, F, Fut>(op: &str, device_id: &str, mut call: F) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(op, device_id, error = %e, "Storage call failed, retrying once");
            call().await
        }
    }
}
