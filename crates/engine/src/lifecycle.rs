use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use common::{Bar, Error, Result, Signal};
use strategy::{StrategyInfo, StrategyRegistry};

use crate::runner::StrategyRunner;

/// Request to load one strategy instance.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    /// Instance id; auto-generated when omitted.
    pub id: Option<String>,
    #[serde(alias = "strategy")]
    pub strategy_type: String,
    /// Parameter overrides merged over the type's defaults.
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Confirmation returned on a successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedStrategy {
    pub id: String,
    pub strategy_type: String,
    /// The caller's parameter overrides, echoed back.
    pub params: Value,
}

/// Status of one running strategy instance.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStatus {
    pub strategy_id: String,
    pub strategy_type: String,
    pub messages_processed: u64,
    /// The instance's read-only state snapshot (indicator values,
    /// position side), refreshed after every processed bar.
    pub state: Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStatus {
    pub strategies: Vec<StrategyStatus>,
    pub total_messages: u64,
    pub available_strategies: Vec<StrategyInfo>,
}

pub enum EngineCommand {
    Load {
        request: LoadRequest,
        reply: oneshot::Sender<Result<LoadedStrategy>>,
    },
    Unload {
        strategy_id: String,
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle passed to the control API and the replay feed.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    market_tx: broadcast::Sender<Bar>,
}

impl EngineHandle {
    pub async fn load(&self, request: LoadRequest) -> Result<LoadedStrategy> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(EngineCommand::Load { request, reply })
            .await
            .map_err(|_| Error::Other("engine is not running".into()))?;
        rx.await
            .map_err(|_| Error::Other("engine dropped the load request".into()))?
    }

    /// Returns whether the strategy was found and stopped. Unloading an
    /// unknown id is a not-found result with no side effects.
    pub async fn unload(&self, strategy_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let send = self
            .command_tx
            .send(EngineCommand::Unload {
                strategy_id: strategy_id.to_string(),
                reply,
            })
            .await;
        if send.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn status(&self) -> EngineStatus {
        let (reply, rx) = oneshot::channel();
        let _ = self.command_tx.send(EngineCommand::Status { reply }).await;
        rx.await.unwrap_or_default()
    }

    /// Stop every strategy (draining in-flight bars, running `on_stop`)
    /// and end the engine loop.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        let _ = self.command_tx.send(EngineCommand::Shutdown { reply }).await;
        let _ = rx.await;
    }

    /// Publish a bar onto the market channel. Send errors (no live
    /// receivers) are ignored.
    pub fn publish_bar(&self, bar: Bar) {
        let _ = self.market_tx.send(bar);
    }

    /// Subscribe to the market bar broadcast.
    pub fn subscribe_market(&self) -> broadcast::Receiver<Bar> {
        self.market_tx.subscribe()
    }
}

struct RunningStrategy {
    strategy_type: String,
    stop_tx: watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
    messages: Arc<AtomicU64>,
    state: Arc<RwLock<Value>>,
}

/// Owns the strategy registry and the set of running strategy tasks.
///
/// Each loaded strategy gets its own task subscribed to the market
/// broadcast, so all bars for one instance are serialized while distinct
/// instances run independently.
pub struct Engine {
    registry: StrategyRegistry,
    market_tx: broadcast::Sender<Bar>,
    signal_tx: mpsc::Sender<Signal>,
    command_rx: mpsc::Receiver<EngineCommand>,
    strategies: HashMap<String, RunningStrategy>,
}

impl Engine {
    pub fn new(registry: StrategyRegistry, signal_tx: mpsc::Sender<Signal>) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (market_tx, _) = broadcast::channel(1024);

        let handle = EngineHandle {
            command_tx,
            market_tx: market_tx.clone(),
        };

        let engine = Self {
            registry,
            market_tx,
            signal_tx,
            command_rx,
            strategies: HashMap::new(),
        };

        (engine, handle)
    }

    /// Run the engine command loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("Engine running — waiting for strategy load requests");
        while let Some(command) = self.command_rx.recv().await {
            match command {
                EngineCommand::Load { request, reply } => {
                    let _ = reply.send(self.load(request));
                }
                EngineCommand::Unload { strategy_id, reply } => {
                    let _ = reply.send(self.unload(&strategy_id).await);
                }
                EngineCommand::Status { reply } => {
                    let _ = reply.send(self.status().await);
                }
                EngineCommand::Shutdown { reply } => {
                    info!("Engine shutting down — stopping all strategies");
                    let ids: Vec<String> = self.strategies.keys().cloned().collect();
                    for id in ids {
                        self.unload(&id).await;
                    }
                    let _ = reply.send(());
                    break;
                }
            }
        }
    }

    fn load(&mut self, request: LoadRequest) -> Result<LoadedStrategy> {
        let strategy_id = request
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", request.strategy_type, Uuid::new_v4()));

        if self.strategies.contains_key(&strategy_id) {
            return Err(Error::StrategyIdInUse(strategy_id));
        }

        let instance = self
            .registry
            .create(&request.strategy_type, &strategy_id, &request.params)?;
        instance.on_start();

        let (stop_tx, stop_rx) = watch::channel(false);
        let messages = Arc::new(AtomicU64::new(0));
        let state = Arc::new(RwLock::new(instance.snapshot()));
        let runner = StrategyRunner::new(
            instance,
            self.market_tx.subscribe(),
            self.signal_tx.clone(),
            stop_rx,
            messages.clone(),
            state.clone(),
        );
        let join = tokio::spawn(runner.run());

        info!(
            strategy = %strategy_id,
            strategy_type = %request.strategy_type,
            "Strategy loaded"
        );
        self.strategies.insert(
            strategy_id.clone(),
            RunningStrategy {
                strategy_type: request.strategy_type.clone(),
                stop_tx,
                join,
                messages,
                state,
            },
        );

        Ok(LoadedStrategy {
            id: strategy_id,
            strategy_type: request.strategy_type,
            params: Value::Object(request.params),
        })
    }

    /// Drain-then-remove: flip the stop flag and await the runner, which
    /// finishes any in-flight bar and calls `on_stop` before the instance
    /// is dropped.
    async fn unload(&mut self, strategy_id: &str) -> bool {
        let Some(entry) = self.strategies.remove(strategy_id) else {
            return false;
        };

        let _ = entry.stop_tx.send(true);
        if let Err(e) = entry.join.await {
            warn!(strategy = %strategy_id, error = %e, "Strategy task ended abnormally");
        }
        info!(strategy = %strategy_id, "Strategy unloaded");
        true
    }

    async fn status(&self) -> EngineStatus {
        let mut strategies = Vec::with_capacity(self.strategies.len());
        let mut total_messages = 0u64;
        for (id, entry) in &self.strategies {
            let messages = entry.messages.load(Ordering::Relaxed);
            total_messages += messages;
            strategies.push(StrategyStatus {
                strategy_id: id.clone(),
                strategy_type: entry.strategy_type.clone(),
                messages_processed: messages,
                state: entry.state.read().await.clone(),
            });
        }
        strategies.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));

        EngineStatus {
            strategies,
            total_messages,
            available_strategies: self.registry.list(),
        }
    }
}
