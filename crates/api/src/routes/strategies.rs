use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::info;

use common::Error;
use engine::LoadRequest;

use crate::AppState;

pub fn strategies_router() -> Router<AppState> {
    Router::new()
        .route("/strategies/load", post(load_strategy))
        .route("/strategies/unload/:strategy_id", post(unload_strategy))
        .route("/strategies/available", get(available_strategies))
        .route("/strategies/info/:name", get(strategy_info))
        .route("/strategies/status", get(strategies_status))
}

// ─── Load / unload ────────────────────────────────────────────────────────────

async fn load_strategy(
    State(state): State<AppState>,
    Json(request): Json<LoadRequest>,
) -> Json<Value> {
    info!(strategy_type = %request.strategy_type, "Load requested");
    match state.engine.load(request).await {
        Ok(loaded) => Json(json!({
            "success": true,
            "id": loaded.id,
            "type": loaded.strategy_type,
            "params": loaded.params,
        })),
        Err(e) => {
            let available = match &e {
                Error::UnknownStrategy { available, .. } => available.clone(),
                _ => available_names(&state).await,
            };
            Json(json!({
                "success": false,
                "error": e.to_string(),
                "available_strategies": available,
            }))
        }
    }
}

async fn unload_strategy(
    State(state): State<AppState>,
    Path(strategy_id): Path<String>,
) -> Json<Value> {
    if state.engine.unload(&strategy_id).await {
        Json(json!({
            "success": true,
            "message": format!("Strategy {strategy_id} unloaded"),
        }))
    } else {
        Json(json!({
            "success": false,
            "message": format!("Strategy {strategy_id} not found"),
        }))
    }
}

// ─── Introspection ────────────────────────────────────────────────────────────

async fn available_strategies(State(state): State<AppState>) -> Json<Value> {
    let available = state.engine.status().await.available_strategies;
    Json(json!({
        "success": true,
        "count": available.len(),
        "strategies": available,
    }))
}

async fn strategy_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<Value> {
    let available = state.engine.status().await.available_strategies;
    match available.iter().find(|info| info.name == name) {
        Some(info) => Json(json!({ "success": true, "info": info })),
        None => Json(json!({
            "success": false,
            "error": format!("Strategy '{name}' not found"),
            "available_strategies": available.iter().map(|i| i.name.clone()).collect::<Vec<_>>(),
        })),
    }
}

async fn strategies_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.engine.status().await;

    let strategies: Map<String, Value> = status
        .strategies
        .iter()
        .map(|s| {
            (
                s.strategy_id.clone(),
                json!({
                    "type": s.strategy_type,
                    "messages_processed": s.messages_processed,
                    "strategy_state": s.state,
                }),
            )
        })
        .collect();

    Json(json!({
        "service": "stratsim",
        "total_messages": status.total_messages,
        "strategies": strategies,
        "available_strategies": status.available_strategies,
    }))
}

async fn available_names(state: &AppState) -> Vec<String> {
    state
        .engine
        .status()
        .await
        .available_strategies
        .into_iter()
        .map(|info| info.name)
        .collect()
}
