//! In-process gateway used by tests and database-less local runs.
//!
//! Honours the same contract as [`PgGateway`](crate::PgGateway): the
//! cooldown check and insert happen under one lock. Failures can be
//! injected to exercise the pipeline's retry and propagation paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pumpwatch_core::alert::{Alert, AlertDraft};
use pumpwatch_core::reading::Reading;
use pumpwatch_core::types::{DbId, Timestamp};

use crate::error::PersistenceError;
use crate::gateway::PersistenceGateway;
use crate::repositories::device_repo::UNKNOWN_LOCATION;

/// Device metadata as tracked in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub location: String,
    pub last_seen_at: Timestamp,
}

#[derive(Default)]
struct Store {
    devices: HashMap<String, DeviceRecord>,
    readings: Vec<(DbId, Reading)>,
    alerts: Vec<Alert>,
}

/// [`PersistenceGateway`] over plain collections.
#[derive(Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
    upsert_failures: AtomicUsize,
    reading_failures: AtomicUsize,
    alerts_unavailable: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` device upserts fail.
    pub fn fail_next_upserts(&self, n: usize) {
        self.upsert_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` reading appends fail.
    pub fn fail_next_readings(&self, n: usize) {
        self.reading_failures.store(n, Ordering::SeqCst);
    }

    /// Make every alert append fail until switched back.
    pub fn set_alerts_unavailable(&self, unavailable: bool) {
        self.alerts_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn device(&self, device_id: &str) -> Option<DeviceRecord> {
        self.lock().devices.get(device_id).cloned()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.lock().readings.iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume one injected failure, if any are pending.
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn upsert_device(
        &self,
        device_id: &str,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), PersistenceError> {
        if Self::take_failure(&self.upsert_failures) {
            return Err(PersistenceError::Unavailable("injected upsert failure".into()));
        }

        let now = Utc::now();
        let mut store = self.lock();
        let record = store
            .devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceRecord {
                device_id: device_id.to_string(),
                name: name.unwrap_or(device_id).to_string(),
                location: location.unwrap_or(UNKNOWN_LOCATION).to_string(),
                last_seen_at: now,
            });
        if let Some(name) = name {
            record.name = name.to_string();
        }
        if let Some(location) = location {
            record.location = location.to_string();
        }
        record.last_seen_at = now;
        Ok(())
    }

    async fn append_reading(&self, reading: &Reading) -> Result<DbId, PersistenceError> {
        if Self::take_failure(&self.reading_failures) {
            return Err(PersistenceError::Unavailable("injected reading failure".into()));
        }

        let mut store = self.lock();
        let id = store.readings.len() as DbId + 1;
        store.readings.push((id, reading.clone()));
        Ok(id)
    }

    async fn append_alert(
        &self,
        draft: &AlertDraft,
        accepted_at: Timestamp,
        cooldown: Duration,
    ) -> Result<Option<Alert>, PersistenceError> {
        if self.alerts_unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("alerts store offline".into()));
        }

        let mut store = self.lock();
        let window_start = accepted_at - cooldown;
        let recent = store.alerts.iter().any(|a| {
            a.device_id == draft.device_id && a.kind == draft.kind && a.timestamp > window_start
        });
        if recent {
            return Ok(None);
        }

        let alert = Alert::from_draft(store.alerts.len() as DbId + 1, draft, accepted_at);
        store.alerts.push(alert.clone());
        Ok(Some(alert))
    }
}
