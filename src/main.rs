//! Rest Timer Sync - broadcast relay server
//!
//! This is the main entry point for the relay: it accepts WebSocket clients
//! and forwards every message to every other connected client.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use rest_timer_sync::{
    api::create_router,
    config::Config,
    state::RelayState,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("rest_timer_sync={},tower_http=info", config.log_level()))
        .init();

    info!("Starting rest-timer-sync relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, ws_path={}, queue_capacity={}",
          config.host, config.port, config.ws_path, config.queue_capacity);

    let state = Arc::new(RelayState::with_queue_capacity(
        config.port,
        config.host.clone(),
        config.queue_capacity,
    ));
    let app = create_router(Arc::clone(&state), &config.ws_path);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  {:<8} - WebSocket timer relay", config.ws_path);
    info!("  GET  /status   - Live connections and relay counters");
    info!("  GET  /health   - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete ({} clients were connected)", state.connection_count());
    Ok(())
}
