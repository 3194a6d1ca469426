pub mod routes;

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use engine::EngineHandle;
use execution::SimulatorHandle;

/// Shared application state injected into every route handler.
/// Built once at process start and passed by reference — no globals.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub sim: SimulatorHandle,
    /// Signals the binary to begin graceful shutdown.
    pub shutdown_tx: mpsc::Sender<()>,
}

/// Build and run the control API.
pub async fn serve(state: AppState, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let app = Router::new()
        .merge(routes::strategies_router())
        .merge(routes::simulator_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors);

    info!(%addr, "Control API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
