//! Periodic keep-alive pings for live sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::ws::hub::LiveHub;

/// Default gap between ping sweeps.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Queue a Ping frame on every session each `every`, starting one period
/// from now. Abort the returned handle on shutdown.
pub fn spawn_keepalive(hub: Arc<LiveHub>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + every, every);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            let sweep = hub.ping_all().await;
            if sweep.dropped > 0 {
                tracing::warn!(
                    queued = sweep.queued,
                    dropped = sweep.dropped,
                    "Keep-alive ping not queued for some live sessions",
                );
            } else if sweep.queued > 0 {
                tracing::debug!(queued = sweep.queued, "Keep-alive ping queued");
            }
        }
    })
}
