//! Alert de-duplication and notification.
//!
//! A draft is accepted only if no alert of the same (device, type) was
//! accepted within the cooldown window, measured on the wall clock from the
//! accepted alert's timestamp. The gateway's transactional check is
//! authoritative; the in-process tracker short-circuits repeats this
//! process already accepted so they never reach storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use pumpwatch_core::alert::{Alert, AlertDraft, AlertKind};
use pumpwatch_core::types::Timestamp;
use pumpwatch_db::PersistenceGateway;
use pumpwatch_events::AlertNotifier;

use crate::clock::Clock;
use crate::error::PipelineError;

type CooldownKey = (String, AlertKind);

/// Tracks when the last alert was accepted per device + alert type.
#[derive(Debug, Default)]
struct CooldownTracker {
    last_accepted: HashMap<CooldownKey, Timestamp>,
}

impl CooldownTracker {
    fn is_cooling_down(&self, key: &CooldownKey, now: Timestamp, cooldown: Duration) -> bool {
        self.last_accepted
            .get(key)
            .is_some_and(|last| now.signed_duration_since(*last) < cooldown)
    }

    fn record(&mut self, key: CooldownKey, accepted_at: Timestamp) {
        self.last_accepted.insert(key, accepted_at);
    }
}

/// Suppresses repeats, persists accepted alerts and fires notifications.
pub struct AlertDeduplicator {
    gateway: Arc<dyn PersistenceGateway>,
    notifier: AlertNotifier,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    tracker: Mutex<CooldownTracker>,
}

impl AlertDeduplicator {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        notifier: AlertNotifier,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            gateway,
            notifier,
            clock,
            cooldown,
            tracker: Mutex::new(CooldownTracker::default()),
        }
    }

    /// Accept or suppress one draft.
    ///
    /// Returns `Ok(None)` when suppressed. Storage failures propagate so the
    /// caller drops this draft rather than risk a duplicate. Notification
    /// runs only after the alert is stored and never feeds back into it.
    pub async fn process(&self, draft: &AlertDraft) -> Result<Option<Alert>, PipelineError> {
        let now = self.clock.now();
        let key = (draft.device_id.clone(), draft.kind);

        if self.tracker().is_cooling_down(&key, now, self.cooldown) {
            tracing::debug!(
                device_id = %draft.device_id,
                alert_type = %draft.kind,
                "Alert suppressed within cooldown",
            );
            return Ok(None);
        }

        let Some(alert) = self.gateway.append_alert(draft, now, self.cooldown).await? else {
            tracing::debug!(
                device_id = %draft.device_id,
                alert_type = %draft.kind,
                "Alert suppressed by stored cooldown window",
            );
            return Ok(None);
        };

        self.tracker().record(key, alert.timestamp);
        tracing::info!(
            alert_id = alert.id,
            device_id = %alert.device_id,
            alert_type = %alert.kind,
            severity = alert.severity.as_str(),
            "Alert accepted",
        );

        self.notifier.dispatch(&alert);
        Ok(Some(alert))
    }

    fn tracker(&self) -> std::sync::MutexGuard<'_, CooldownTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
