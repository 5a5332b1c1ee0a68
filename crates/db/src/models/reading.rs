//! Stored telemetry reading.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use pumpwatch_core::reading::{ProtectionFlags, PumpTelemetry, Reading, PUMP_COUNT};
use pumpwatch_core::types::{DbId, Timestamp};

/// A row from the `device_readings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadingRow {
    pub id: DbId,
    pub device_id: String,
    pub recorded_at: Timestamp,
    pub water_level: f64,
    pub temperature: f64,
    pub pumps: Json<[PumpTelemetry; PUMP_COUNT]>,
    pub dry_run_alert: bool,
    pub high_level_float_alert: bool,
    pub pump_1_protection: bool,
    pub pump_2_protection: bool,
    pub raw_payload: serde_json::Value,
    pub created_at: Timestamp,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            device_id: row.device_id,
            timestamp: row.recorded_at,
            device_name: None,
            location: None,
            water_level: row.water_level,
            temperature: row.temperature,
            pumps: row.pumps.0,
            flags: ProtectionFlags {
                dry_run: row.dry_run_alert,
                high_level_float: row.high_level_float_alert,
                pump_1_protection: row.pump_1_protection,
                pump_2_protection: row.pump_2_protection,
            },
            raw: row.raw_payload,
        }
    }
}
