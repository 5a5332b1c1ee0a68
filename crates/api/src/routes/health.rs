use axum::extract::State;
use axum::{routing::get, Json, Router};
use pumpwatch_mqtt::TransportStatus;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` when the database and the broker session are both up.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub transport: TransportStatus,
    pub live_sessions: usize,
}

/// GET /health -- returns service, database and transport health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = pumpwatch_db::health_check(&state.pool).await.is_ok();
    let transport = state.transport.status();

    let status = if db_healthy && transport.connected {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        transport,
        live_sessions: state.hub.session_count().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
