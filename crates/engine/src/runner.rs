use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, warn};

use common::{Bar, Signal};
use strategy::Strategy;

/// Drives one strategy instance.
///
/// The runner exclusively owns its instance, so every bar is processed in
/// arrival order with no concurrent mutation of the rolling window. The
/// stop flag is only checked between bars: an unload drains the in-flight
/// bar, runs `on_stop`, and then lets the instance drop.
pub(crate) struct StrategyRunner {
    instance: Box<dyn Strategy>,
    market_rx: broadcast::Receiver<Bar>,
    signal_tx: mpsc::Sender<Signal>,
    stop_rx: watch::Receiver<bool>,
    messages: Arc<AtomicU64>,
    state: Arc<RwLock<Value>>,
}

impl StrategyRunner {
    pub(crate) fn new(
        instance: Box<dyn Strategy>,
        market_rx: broadcast::Receiver<Bar>,
        signal_tx: mpsc::Sender<Signal>,
        stop_rx: watch::Receiver<bool>,
        messages: Arc<AtomicU64>,
        state: Arc<RwLock<Value>>,
    ) -> Self {
        Self {
            instance,
            market_rx,
            signal_tx,
            stop_rx,
            messages,
            state,
        }
    }

    /// Run the bar loop until stopped. Call from `tokio::spawn`.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.stop_rx.changed() => break,
                bar = self.market_rx.recv() => match bar {
                    Ok(bar) => {
                        if bar.symbol != self.instance.symbol() {
                            continue;
                        }
                        self.messages.fetch_add(1, Ordering::Relaxed);

                        let signal = self.instance.process_bar(&bar);
                        *self.state.write().await = self.instance.snapshot();

                        if let Some(signal) = signal {
                            debug!(
                                strategy = %signal.strategy_id,
                                action = %signal.action,
                                price = signal.price,
                                "Signal emitted"
                            );
                            if self.signal_tx.send(signal).await.is_err() {
                                warn!(
                                    strategy = %self.instance.strategy_id(),
                                    "Signal channel closed — stopping strategy task"
                                );
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            strategy = %self.instance.strategy_id(),
                            dropped = n,
                            "Strategy task lagged — dropped bars"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        self.instance.on_stop();
    }
}
