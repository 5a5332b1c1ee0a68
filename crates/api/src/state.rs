use std::sync::Arc;

use pumpwatch_mqtt::TransportClient;

use crate::auth::users::UserDirectory;
use crate::config::ServerConfig;
use crate::ws::LiveHub;

/// Process-lifetime context shared by all handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: pumpwatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Live sessions (browser clients).
    pub hub: Arc<LiveHub>,
    /// User store consulted when a live session authenticates.
    pub users: Arc<dyn UserDirectory>,
    /// Broker session, read for health reporting.
    pub transport: Arc<TransportClient>,
}
