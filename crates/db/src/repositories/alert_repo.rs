//! Repository for the `alerts` table.

use sqlx::{PgConnection, PgPool};
use pumpwatch_core::alert::{AlertDraft, AlertKind};
use pumpwatch_core::types::{DbId, Timestamp};

use crate::models::alert::AlertRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, device_id, alert_type, severity, message, threshold_value, \
                        actual_value, triggered_at, observed_at, acknowledged, \
                        acknowledged_by, acknowledged_at";

/// Provides read/write operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Take a transaction-scoped advisory lock on one (device, alert type) pair.
    ///
    /// Concurrent writers for the same pair queue here until the holder's
    /// transaction ends.
    pub async fn lock_pair(
        conn: &mut PgConnection,
        device_id: &str,
        kind: AlertKind,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("alert:{device_id}:{kind}"))
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Whether an alert of this pair was triggered strictly after `since`.
    pub async fn exists_since(
        conn: &mut PgConnection,
        device_id: &str,
        kind: AlertKind,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM alerts \
                WHERE device_id = $1 AND alert_type = $2 AND triggered_at > $3)",
        )
        .bind(device_id)
        .bind(kind.as_str())
        .bind(since)
        .fetch_one(conn)
        .await
    }

    /// Insert an accepted alert stamped at `triggered_at`, returning the row.
    pub async fn insert(
        conn: &mut PgConnection,
        draft: &AlertDraft,
        triggered_at: Timestamp,
    ) -> Result<AlertRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts \
                (device_id, alert_type, severity, message, threshold_value, \
                 actual_value, triggered_at, observed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(&draft.device_id)
            .bind(draft.kind.as_str())
            .bind(draft.severity.as_str())
            .bind(&draft.message)
            .bind(draft.threshold_value)
            .bind(draft.actual_value)
            .bind(triggered_at)
            .bind(draft.observed_at)
            .fetch_one(conn)
            .await
    }

    /// Find an alert by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List recent alerts, optionally for one device, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AlertRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE ($1::TEXT IS NULL OR device_id = $1) \
             ORDER BY triggered_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Mark an alert acknowledged by `user_id`.
    ///
    /// Returns `None` if the alert does not exist or was already acknowledged.
    pub async fn acknowledge(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<AlertRow>, sqlx::Error> {
        let query = format!(
            "UPDATE alerts SET acknowledged = true, acknowledged_by = $2, acknowledged_at = NOW() \
             WHERE id = $1 AND acknowledged = false \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
