//! Stored alert.

use serde::Serialize;
use sqlx::FromRow;
use pumpwatch_core::alert::Alert;
use pumpwatch_core::types::{DbId, Timestamp};

use crate::error::PersistenceError;

/// A row from the `alerts` table. Enum columns are kept as text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertRow {
    pub id: DbId,
    pub device_id: String,
    pub alert_type: String,
    pub severity: String,
    pub message: String,
    pub threshold_value: Option<f64>,
    pub actual_value: Option<f64>,
    pub triggered_at: Timestamp,
    pub observed_at: Timestamp,
    pub acknowledged: bool,
    pub acknowledged_by: Option<DbId>,
    pub acknowledged_at: Option<Timestamp>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = PersistenceError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            device_id: row.device_id,
            kind: row.alert_type.parse()?,
            severity: row.severity.parse()?,
            message: row.message,
            threshold_value: row.threshold_value,
            actual_value: row.actual_value,
            timestamp: row.triggered_at,
            observed_at: row.observed_at,
            acknowledged: row.acknowledged,
            acknowledged_by: row.acknowledged_by,
            acknowledged_at: row.acknowledged_at,
        })
    }
}
