//! HTTP API module
//!
//! This module contains the relay's WebSocket endpoint plus the health and
//! status endpoints.

pub mod handlers;
pub mod responses;
pub mod socket;

use std::sync::Arc;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::RelayState;
use handlers::*;

/// Create the HTTP router with the WebSocket relay mounted at `ws_path`
pub fn create_router(state: Arc<RelayState>, ws_path: &str) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::responses::{HealthResponse, StatusResponse};

    #[tokio::test]
    async fn health_reports_ok() {
        let app = create_router(Arc::new(RelayState::new(5000, "127.0.0.1".into())), "/ws");
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn status_reports_live_connections() {
        let state = Arc::new(RelayState::new(5000, "127.0.0.1".into()));
        let (_id, _rx) = state.on_connect().unwrap();
        let app = create_router(Arc::clone(&state), "/ws");

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(status.live_connections, 1);
        assert_eq!(status.stats.connections_accepted, 1);
        assert_eq!(status.port, 5000);
        assert_eq!(status.uptime, state.get_uptime());
    }

    #[tokio::test]
    async fn relay_path_requires_upgrade() {
        let app = create_router(Arc::new(RelayState::new(5000, "127.0.0.1".into())), "/ws");
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
