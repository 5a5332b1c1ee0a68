//! Repository for the append-only `device_readings` table.

use sqlx::types::Json;
use sqlx::PgPool;
use pumpwatch_core::reading::Reading;
use pumpwatch_core::types::DbId;

use crate::models::reading::ReadingRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, device_id, recorded_at, water_level, temperature, pumps, \
                        dry_run_alert, high_level_float_alert, pump_1_protection, \
                        pump_2_protection, raw_payload, created_at";

/// Provides append and read operations for telemetry readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Append a reading, returning the generated ID. Never updates.
    pub async fn insert(pool: &PgPool, reading: &Reading) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO device_readings \
                (device_id, recorded_at, water_level, temperature, pumps, \
                 dry_run_alert, high_level_float_alert, pump_1_protection, \
                 pump_2_protection, raw_payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id",
        )
        .bind(&reading.device_id)
        .bind(reading.timestamp)
        .bind(reading.water_level)
        .bind(reading.temperature)
        .bind(Json(&reading.pumps))
        .bind(reading.flags.dry_run)
        .bind(reading.flags.high_level_float)
        .bind(reading.flags.pump_1_protection)
        .bind(reading.flags.pump_2_protection)
        .bind(&reading.raw)
        .fetch_one(pool)
        .await
    }

    /// Most recent readings for a device, newest event time first.
    pub async fn list_recent(
        pool: &PgPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<ReadingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_readings \
             WHERE device_id = $1 \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, ReadingRow>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count readings stored for a device.
    pub async fn count_for_device(pool: &PgPool, device_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM device_readings WHERE device_id = $1")
            .bind(device_id)
            .fetch_one(pool)
            .await
    }
}
