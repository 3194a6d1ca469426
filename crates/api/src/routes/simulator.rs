use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use execution::SimConfigPatch;

use crate::AppState;

pub fn simulator_router() -> Router<AppState> {
    Router::new()
        .route("/config", get(get_config).post(update_config))
        .route("/positions", get(get_positions))
        .route("/reset", post(reset))
}

// ─── Config ───────────────────────────────────────────────────────────────────

async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "config": state.sim.config().await }))
}

/// Partial update: only the fields present in the body change.
async fn update_config(
    State(state): State<AppState>,
    Json(patch): Json<SimConfigPatch>,
) -> Json<Value> {
    let config = state.sim.update_config(patch).await;
    Json(json!({ "success": true, "config": config }))
}

// ─── Positions / reset ────────────────────────────────────────────────────────

async fn get_positions(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.sim.snapshot().await;
    Json(json!({
        "positions": snapshot.sessions,
        "fill_count": snapshot.total_fills,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ResetRequest {
    strategy_id: Option<String>,
}

/// Clear one session, or every session when no id is given. Resetting an
/// empty session set is a no-op that still succeeds.
async fn reset(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Json<Value> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    match request.strategy_id {
        Some(strategy_id) => {
            let found = state.sim.reset_session(&strategy_id).await;
            Json(json!({
                "success": found,
                "message": if found {
                    format!("Session {strategy_id} reset")
                } else {
                    format!("Session {strategy_id} not found")
                },
            }))
        }
        None => {
            let cleared = state.sim.reset_all().await;
            Json(json!({ "success": true, "sessions_cleared": cleared }))
        }
    }
}
