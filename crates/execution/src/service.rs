use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use common::{Bar, ExecutionEvent, Rejection, Signal};

use crate::simulator::{ExecutionSimulator, FillOutcome, SimConfig, SimConfigPatch, SimSnapshot};

/// Commands accepted by the running simulator task. Each carries a oneshot
/// reply so callers can await the serialized result.
pub enum SimCommand {
    UpdateConfig {
        patch: SimConfigPatch,
        reply: oneshot::Sender<SimConfig>,
    },
    GetConfig {
        reply: oneshot::Sender<SimConfig>,
    },
    ResetSession {
        strategy_id: String,
        reply: oneshot::Sender<bool>,
    },
    ResetAll {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<SimSnapshot>,
    },
}

/// Cloneable handle passed to the control API.
#[derive(Clone)]
pub struct SimulatorHandle {
    command_tx: mpsc::Sender<SimCommand>,
    event_tx: broadcast::Sender<ExecutionEvent>,
}

impl SimulatorHandle {
    pub async fn update_config(&self, patch: SimConfigPatch) -> SimConfig {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .command_tx
            .send(SimCommand::UpdateConfig { patch, reply })
            .await;
        rx.await.unwrap_or_default()
    }

    pub async fn config(&self) -> SimConfig {
        let (reply, rx) = oneshot::channel();
        let _ = self.command_tx.send(SimCommand::GetConfig { reply }).await;
        rx.await.unwrap_or_default()
    }

    pub async fn reset_session(&self, strategy_id: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .command_tx
            .send(SimCommand::ResetSession {
                strategy_id: strategy_id.to_string(),
                reply,
            })
            .await;
        rx.await.unwrap_or(false)
    }

    pub async fn reset_all(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        let _ = self.command_tx.send(SimCommand::ResetAll { reply }).await;
        rx.await.unwrap_or(0)
    }

    pub async fn snapshot(&self) -> SimSnapshot {
        let (reply, rx) = oneshot::channel();
        let _ = self.command_tx.send(SimCommand::Snapshot { reply }).await;
        rx.await.unwrap_or_default()
    }

    /// Subscribe to the fill/rejection event broadcast.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_tx.subscribe()
    }
}

/// Owns the simulator state and serializes every mutation: signals, quote
/// updates, resets, and config changes all pass through one loop, so a
/// reset can never interleave with an in-flight fill for the same session.
pub struct SimulatorService {
    sim: ExecutionSimulator,
    signal_rx: mpsc::Receiver<Signal>,
    market_rx: broadcast::Receiver<Bar>,
    command_rx: mpsc::Receiver<SimCommand>,
    event_tx: broadcast::Sender<ExecutionEvent>,
}

impl SimulatorService {
    pub fn new(
        config: SimConfig,
        signal_rx: mpsc::Receiver<Signal>,
        market_rx: broadcast::Receiver<Bar>,
    ) -> (Self, SimulatorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(1024);

        let handle = SimulatorHandle {
            command_tx,
            event_tx: event_tx.clone(),
        };

        let service = Self {
            sim: ExecutionSimulator::new(config),
            signal_rx,
            market_rx,
            command_rx,
            event_tx,
        };

        (service, handle)
    }

    /// Run the simulator loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("ExecutionSimulator running");
        loop {
            tokio::select! {
                signal = self.signal_rx.recv() => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None => {
                        warn!("Signal channel closed — simulator exiting");
                        return;
                    }
                },
                bar = self.market_rx.recv() => match bar {
                    Ok(bar) => self.sim.update_quote(&bar),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(dropped = n, "Simulator market channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Market broadcast channel closed — simulator exiting");
                        return;
                    }
                },
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        warn!("Simulator command channel closed — simulator exiting");
                        return;
                    }
                },
            }
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        match self.sim.simulate_fill(&signal) {
            FillOutcome::Filled(fill) => {
                info!(
                    strategy = %fill.strategy_id,
                    symbol = %fill.symbol,
                    action = %fill.action,
                    quantity = fill.quantity,
                    price = fill.price,
                    position = fill.position_after,
                    "Fill"
                );
                let _ = self.event_tx.send(ExecutionEvent::Fill(fill));
            }
            FillOutcome::Rejected { reason } => {
                warn!(
                    strategy = %signal.strategy_id,
                    symbol = %signal.symbol,
                    reason = %reason,
                    "Signal rejected"
                );
                let rejection = Rejection {
                    strategy_id: signal.strategy_id.clone(),
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                    signal,
                };
                let _ = self.event_tx.send(ExecutionEvent::Rejection(rejection));
            }
        }
    }

    fn handle_command(&mut self, command: SimCommand) {
        match command {
            SimCommand::UpdateConfig { patch, reply } => {
                let config = self.sim.apply_config(&patch);
                info!(
                    slippage_pct = config.slippage_pct,
                    commission = config.commission,
                    fill_mode = %config.fill_mode,
                    "Simulator config updated"
                );
                let _ = reply.send(config);
            }
            SimCommand::GetConfig { reply } => {
                let _ = reply.send(self.sim.config().clone());
            }
            SimCommand::ResetSession { strategy_id, reply } => {
                let existed = self.sim.reset_session(&strategy_id);
                info!(strategy = %strategy_id, existed, "Session reset");
                let _ = reply.send(existed);
            }
            SimCommand::ResetAll { reply } => {
                let count = self.sim.reset_all();
                info!(sessions = count, "All sessions reset");
                let _ = reply.send(count);
            }
            SimCommand::Snapshot { reply } => {
                let _ = reply.send(self.sim.snapshot());
            }
        }
    }
}
