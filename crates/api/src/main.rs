use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pumpwatch_api::app::build_app;
use pumpwatch_api::auth::users::PgUserDirectory;
use pumpwatch_api::config::ServerConfig;
use pumpwatch_api::state::AppState;
use pumpwatch_api::ws;
use pumpwatch_db::PgGateway;
use pumpwatch_events::AlertNotifier;
use pumpwatch_mqtt::{MqttConfig, TransportClient};
use pumpwatch_pipeline::{Pipeline, PipelineConfig, SystemClock};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "pumpwatch_api=debug,pumpwatch_pipeline=info,pumpwatch_mqtt=info,\
             pumpwatch_events=info,pumpwatch_db=info,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline_config = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    tracing::info!(
        cooldown_secs = pipeline_config.alert_cooldown.num_seconds(),
        "Loaded pipeline configuration",
    );

    let mqtt_config = MqttConfig::from_env().expect("Invalid MQTT configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pumpwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pumpwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    pumpwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Live hub ---
    let hub = Arc::new(ws::LiveHub::new(config.live_session_queue));
    let keepalive_handle = ws::spawn_keepalive(Arc::clone(&hub), ws::KEEPALIVE_INTERVAL);

    // --- Notifications ---
    let notifier = AlertNotifier::from_env();
    tracing::info!(channels = ?notifier.channel_names(), "Alert notification channels");

    // --- Pipeline ---
    let pipeline = Arc::new(Pipeline::new(
        pipeline_config,
        Arc::new(PgGateway::new(pool.clone())),
        notifier,
        hub.clone(),
        Arc::new(SystemClock),
    ));

    // --- Transport ---
    let mut transport = TransportClient::new(mqtt_config);
    transport.on_message(pipeline);
    transport
        .connect()
        .expect("Failed to start MQTT transport");
    let transport = Arc::new(transport);

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        hub: Arc::clone(&hub),
        users: Arc::new(PgUserDirectory::new(pool)),
        transport: Arc::clone(&transport),
    };

    let app = build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    transport.disconnect().await;
    tracing::info!("MQTT transport stopped");

    let session_count = hub.session_count().await;
    tracing::info!(session_count, "Closing remaining live sessions");
    hub.shutdown_all().await;

    keepalive_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
