//! Integration tests for the PostgreSQL gateway.
//!
//! These need a reachable `DATABASE_URL` and are ignored by default:
//! `cargo test -p pumpwatch-db -- --ignored`.

use chrono::{Duration, TimeZone, Utc};
use pumpwatch_core::alert::{Alert, AlertDraft, AlertKind, Severity};
use pumpwatch_core::normalize::normalize_at;
use pumpwatch_core::types::Timestamp;
use pumpwatch_db::models::user::CreateUser;
use pumpwatch_db::repositories::{AlertRepo, DeviceRepo, ReadingRepo, UserRepo};
use pumpwatch_db::{PersistenceGateway, PgGateway};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(minutes: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn dry_run(device_id: &str) -> AlertDraft {
    AlertDraft {
        device_id: device_id.to_string(),
        kind: AlertKind::DryRun,
        severity: Severity::Critical,
        message: "Dry run condition detected".to_string(),
        threshold_value: None,
        actual_value: None,
        observed_at: at(0),
    }
}

// ---------------------------------------------------------------------------
// Devices and readings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn upsert_device_is_idempotent(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();
    gw.upsert_device("D1", Some("North"), Some("Khusam")).await.unwrap();
    gw.upsert_device("D1", None, None).await.unwrap();

    let device = DeviceRepo::find_by_device_id(&pool, "D1").await.unwrap().unwrap();
    assert_eq!(device.name, "North");
    assert_eq!(device.location, "Khusam");
    assert!(device.last_seen_at.is_some());
    assert_eq!(DeviceRepo::list_active(&pool).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn readings_are_appended_not_overwritten(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();

    let payload = br#"{"device_id":"D1","vrms_1_r":231.5,"dry_run_alert":1}"#;
    let reading = normalize_at(payload, at(0)).unwrap();
    let first = gw.append_reading(&reading).await.unwrap();
    let second = gw.append_reading(&reading).await.unwrap();
    assert_ne!(first, second);

    assert_eq!(ReadingRepo::count_for_device(&pool, "D1").await.unwrap(), 2);
    let rows = ReadingRepo::list_recent(&pool, "D1", 10).await.unwrap();
    assert_eq!(rows[0].pumps.0[0].voltage.r, 231.5);
    assert!(rows[0].dry_run_alert);
    assert_eq!(rows[0].raw_payload["device_id"], "D1");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reporting_again_reactivates_a_deactivated_device(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();

    assert!(DeviceRepo::deactivate(&pool, "D1").await.unwrap());
    assert!(!DeviceRepo::deactivate(&pool, "D1").await.unwrap());
    assert!(DeviceRepo::list_active(&pool).await.unwrap().is_empty());

    gw.upsert_device("D1", None, None).await.unwrap();
    let device = DeviceRepo::find_by_device_id(&pool, "D1").await.unwrap().unwrap();
    assert!(device.is_active);
    assert_eq!(DeviceRepo::list_active(&pool).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn append_alert_enforces_cooldown(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();
    let cooldown = Duration::minutes(5);

    let accepted = gw.append_alert(&dry_run("D1"), at(0), cooldown).await.unwrap();
    assert!(accepted.is_some());
    assert!(gw.append_alert(&dry_run("D1"), at(4), cooldown).await.unwrap().is_none());
    assert!(gw.append_alert(&dry_run("D1"), at(6), cooldown).await.unwrap().is_some());

    let rows = AlertRepo::list_recent(&pool, Some("D1"), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_appends_accept_exactly_one(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let gw = gw.clone();
        handles.push(tokio::spawn(async move {
            gw.append_alert(&dry_run("D1"), at(0), Duration::minutes(5)).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn acknowledge_records_user_once(pool: PgPool) {
    let gw = PgGateway::new(pool.clone());
    gw.upsert_device("D1", None, None).await.unwrap();
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "operator".to_string(),
            email: None,
            role: "operator".to_string(),
        },
    )
    .await
    .unwrap();

    let alert = gw
        .append_alert(&dry_run("D1"), at(0), Duration::minutes(5))
        .await
        .unwrap()
        .unwrap();

    let row = AlertRepo::acknowledge(&pool, alert.id, user.id).await.unwrap().unwrap();
    let acked = Alert::try_from(row).unwrap();
    assert!(acked.acknowledged);
    assert_eq!(acked.acknowledged_by, Some(user.id));
    assert!(acked.acknowledged_at.is_some());

    assert!(AlertRepo::acknowledge(&pool, alert.id, user.id).await.unwrap().is_none());

    let stored = AlertRepo::find_by_id(&pool, alert.id).await.unwrap().unwrap();
    assert_eq!(stored.acknowledged_by, Some(user.id));
    assert!(AlertRepo::find_by_id(&pool, alert.id + 1000).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deactivated_user_is_no_longer_found(pool: PgPool) {
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "viewer".to_string(),
            email: Some("viewer@example.com".to_string()),
            role: "viewer".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(UserRepo::find_active(&pool, user.id).await.unwrap().is_some());

    assert!(UserRepo::deactivate(&pool, user.id).await.unwrap());
    assert!(UserRepo::find_active(&pool, user.id).await.unwrap().is_none());
    assert!(!UserRepo::deactivate(&pool, user.id).await.unwrap());
}
