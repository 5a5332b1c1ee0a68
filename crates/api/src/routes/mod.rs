pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the route tree.
///
/// ```text
/// /health      service, database and transport health
/// /ws          live channel (token via ?token= or Bearer header)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .route("/ws", get(ws::ws_handler))
}
