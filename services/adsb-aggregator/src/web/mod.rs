//! HTTP and WebSocket surface

mod api;
mod ws_handler;

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aircraft::SharedEngine;
use crate::feed::ConnectionState;

/// Shared application state
pub struct AppState {
    pub engine: SharedEngine,
    pub broadcast_tx: broadcast::Sender<String>,
    pub feed_state: watch::Receiver<ConnectionState>,
}

/// Build the HTTP/WebSocket router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket endpoint
        .route("/ws", get(ws_handler::ws_handler))
        // REST API endpoints
        .route("/api/aircraft", get(api::get_aircraft))
        .route("/api/aircraft/:hex", get(api::get_aircraft_by_hex))
        .route("/api/stats", get(api::get_stats))
        .route("/health", get(api::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
