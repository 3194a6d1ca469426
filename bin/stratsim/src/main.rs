use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, Signal};
use engine::{BarReplay, Engine, LoadRequest};
use execution::{SimConfig, SimulatorService};
use strategy::preload::PreloadFile;
use strategy::StrategyRegistry;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(port = cfg.api_port, "StratSim starting");

    // ── Strategy registry (compiled-in strategy types) ────────────────────────
    let registry = StrategyRegistry::builtin();
    info!(strategies = registry.len(), "Strategy registry ready");

    // ── Channels ──────────────────────────────────────────────────────────────
    let (signal_tx, signal_rx) = mpsc::channel::<Signal>(128);
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, engine_handle) = Engine::new(registry, signal_tx);

    // ── Execution simulator ───────────────────────────────────────────────────
    let sim_config = SimConfig {
        slippage_pct: cfg.slippage_pct,
        commission: cfg.commission,
        fill_mode: cfg.fill_mode,
    };
    let (simulator, sim_handle) =
        SimulatorService::new(sim_config, signal_rx, engine_handle.subscribe_market());

    // ── Control API ───────────────────────────────────────────────────────────
    let api_state = api::AppState {
        engine: engine_handle.clone(),
        sim: sim_handle.clone(),
        shutdown_tx,
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    tokio::spawn(engine.run());
    tokio::spawn(simulator.run());
    tokio::spawn(api::serve(api_state, cfg.api_port));

    // ── Preload strategies from the optional TOML file ────────────────────────
    if let Some(path) = &cfg.strategy_config_path {
        match PreloadFile::load(path) {
            Ok(file) => {
                for entry in &file.strategies {
                    let request = LoadRequest {
                        id: entry.id.clone(),
                        strategy_type: entry.strategy_type.clone(),
                        params: entry.json_params(),
                    };
                    match engine_handle.load(request).await {
                        Ok(loaded) => info!(strategy = %loaded.id, "Preloaded strategy"),
                        Err(e) => error!(
                            strategy_type = %entry.strategy_type,
                            error = %e,
                            "Failed to preload strategy"
                        ),
                    }
                }
            }
            Err(e) => error!(path = %path, error = %e, "Failed to load strategy config"),
        }
    }

    // ── Replay feed ───────────────────────────────────────────────────────────
    if let Some(path) = &cfg.replay_file {
        tokio::spawn(BarReplay::new(path.clone(), engine_handle.clone()).run());
    }

    // ── Wait for shutdown ─────────────────────────────────────────────────────
    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        _ = shutdown_rx.recv() => info!("Shutdown requested via control API"),
    }

    engine_handle.shutdown().await;
    info!("Exiting");
}
