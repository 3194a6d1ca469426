use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/shutdown", post(shutdown))
        // legacy alias kept for existing control clients
        .route("/api/shutdown", post(shutdown))
}

/// Health check endpoint — read-only snapshot of loaded strategies and
/// fill counts.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let status = state.engine.status().await;
    let snapshot = state.sim.snapshot().await;
    Json(json!({
        "status": "running",
        "strategies_loaded": status.strategies.len(),
        "strategies_available": status.available_strategies.len(),
        "fills": snapshot.total_fills,
    }))
}

/// Gracefully stop the process. The response is sent before shutdown
/// proceeds, so control clients get an acknowledgement.
async fn shutdown(State(state): State<AppState>) -> Json<Value> {
    info!("Shutdown requested via API");
    let _ = state.shutdown_tx.send(()).await;
    Json(json!({ "success": true, "message": "Shutting down" }))
}
