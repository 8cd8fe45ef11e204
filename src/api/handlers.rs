//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{State, WebSocketUpgrade},
    http::StatusCode,
    response::{Json, Response},
};
use tracing::{debug, error};

use super::{
    responses::{HealthResponse, StatusResponse},
    socket::handle_socket,
};
use crate::state::RelayState;

/// Handle GET on the relay path - upgrade to a WebSocket and join the fan-out
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> Response {
    debug!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle GET /status - Return relay counters and live connection count
pub async fn status_handler(State(state): State<Arc<RelayState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let stats = match state.stats() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to get relay stats: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Ok(Json(StatusResponse::new(
        state.connection_count(),
        stats,
        state.get_uptime(),
        state.port,
        state.host.clone(),
    )))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
