//! The storage seam consumed by the ingestion pipeline.

use async_trait::async_trait;
use chrono::Duration;
use pumpwatch_core::alert::{Alert, AlertDraft};
use pumpwatch_core::reading::Reading;
use pumpwatch_core::types::{DbId, Timestamp};

use crate::error::PersistenceError;
use crate::repositories::{AlertRepo, DeviceRepo, ReadingRepo};
use crate::DbPool;

/// Storage operations the pipeline depends on.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Idempotently create the device and mark it seen now.
    async fn upsert_device(
        &self,
        device_id: &str,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), PersistenceError>;

    /// Append a reading. Never overwrites an earlier one.
    async fn append_reading(&self, reading: &Reading) -> Result<DbId, PersistenceError>;

    /// Persist `draft` as an alert accepted at `accepted_at`, unless an alert
    /// of the same (device, type) was accepted less than `cooldown` earlier.
    ///
    /// The check and the insert are atomic: two concurrent calls for the same
    /// pair can never both return `Some`.
    async fn append_alert(
        &self,
        draft: &AlertDraft,
        accepted_at: Timestamp,
        cooldown: Duration,
    ) -> Result<Option<Alert>, PersistenceError>;
}

/// PostgreSQL-backed gateway.
#[derive(Clone)]
pub struct PgGateway {
    pool: DbPool,
}

impl PgGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn upsert_device(
        &self,
        device_id: &str,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), PersistenceError> {
        DeviceRepo::upsert_seen(&self.pool, device_id, name, location).await?;
        Ok(())
    }

    async fn append_reading(&self, reading: &Reading) -> Result<DbId, PersistenceError> {
        Ok(ReadingRepo::insert(&self.pool, reading).await?)
    }

    async fn append_alert(
        &self,
        draft: &AlertDraft,
        accepted_at: Timestamp,
        cooldown: Duration,
    ) -> Result<Option<Alert>, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        AlertRepo::lock_pair(&mut *tx, &draft.device_id, draft.kind).await?;

        let window_start = accepted_at - cooldown;
        if AlertRepo::exists_since(&mut *tx, &draft.device_id, draft.kind, window_start).await? {
            tx.rollback().await?;
            tracing::debug!(
                device_id = %draft.device_id,
                alert_type = %draft.kind,
                "Alert suppressed by stored cooldown window",
            );
            return Ok(None);
        }

        let row = AlertRepo::insert(&mut *tx, draft, accepted_at).await?;
        tx.commit().await?;

        Ok(Some(Alert::try_from(row)?))
    }
}
