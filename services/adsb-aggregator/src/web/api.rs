//! REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::AppState;
use crate::types::TransponderAddress;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let feed = *state.feed_state.borrow();
    let summary = state.engine.summary().await;
    Json(json!({
        "status": "ok",
        "feed": feed.to_string(),
        "aircraft": summary.total_aircraft,
        "synthetic": summary.synthetic,
    }))
}

/// Current snapshot, same shape as the WebSocket push
pub async fn get_aircraft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.snapshot().await)
}

/// One live aircraft by hex address
pub async fn get_aircraft_by_hex(
    State(state): State<Arc<AppState>>,
    Path(hex): Path<String>,
) -> impl IntoResponse {
    let address = match hex.parse::<TransponderAddress>() {
        Ok(address) => address,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response();
        }
    };

    let snapshot = state.engine.snapshot().await;
    match snapshot.find(address) {
        Some(view) => Json(view).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("aircraft {} not tracked", address)})),
        )
            .into_response(),
    }
}

/// Receiver statistics
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.stats_report().await)
}
