//! Repository for the `devices` table.

use sqlx::PgPool;

use crate::models::device::Device;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, device_id, name, location, latitude, longitude, is_active, \
                        last_seen_at, created_at, updated_at";

/// Location recorded for devices that never reported one.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Provides read/write operations for devices.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Create the device if missing and stamp `last_seen_at = NOW()`.
    ///
    /// A new device is named after its id when no name is given. An existing
    /// device only has name/location overwritten by non-null values, and is
    /// re-activated if it had been deactivated.
    pub async fn upsert_seen(
        pool: &PgPool,
        device_id: &str,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (device_id, name, location, last_seen_at)
             VALUES ($1, COALESCE($2, $1), COALESCE($3, '{UNKNOWN_LOCATION}'), NOW())
             ON CONFLICT (device_id) DO UPDATE SET
                name = COALESCE($2, devices.name),
                location = COALESCE($3, devices.location),
                is_active = true,
                last_seen_at = NOW(),
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(device_id)
            .bind(name)
            .bind(location)
            .fetch_one(pool)
            .await
    }

    /// Find a device by its external identifier.
    pub async fn find_by_device_id(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE device_id = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(device_id)
            .fetch_optional(pool)
            .await
    }

    /// List active devices ordered by identifier.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Device>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM devices WHERE is_active = true ORDER BY device_id");
        sqlx::query_as::<_, Device>(&query).fetch_all(pool).await
    }

    /// Soft-deactivate a device. Returns `true` if the row was updated.
    pub async fn deactivate(pool: &PgPool, device_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE devices SET is_active = false, updated_at = NOW()
             WHERE device_id = $1 AND is_active = true",
        )
        .bind(device_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
