use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Bar, Fill, FillMode, Signal, SignalAction};

use crate::ledger::{PositionLedger, RejectReason};

/// Process-wide fill economics. Hot-updatable at runtime through
/// `SimConfigPatch`; updates are applied inside the simulator task's
/// serialized loop, so readers never observe a partial value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Slippage as a percentage of the base price (0.05 = 0.05%).
    pub slippage_pct: f64,
    /// Flat commission recorded on every fill.
    pub commission: f64,
    /// Which bar price anchors the fill.
    pub fill_mode: FillMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            slippage_pct: 0.05,
            commission: 1.0,
            fill_mode: FillMode::Conservative,
        }
    }
}

/// Partial configuration update; only the provided fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfigPatch {
    pub slippage_pct: Option<f64>,
    pub commission: Option<f64>,
    pub fill_mode: Option<FillMode>,
}

impl SimConfig {
    pub fn apply(&mut self, patch: &SimConfigPatch) {
        if let Some(v) = patch.slippage_pct {
            self.slippage_pct = v;
        }
        if let Some(v) = patch.commission {
            self.commission = v;
        }
        if let Some(v) = patch.fill_mode {
            self.fill_mode = v;
        }
    }
}

/// Latest known prices for one symbol.
#[derive(Debug, Clone, Copy)]
struct Quote {
    high: f64,
    low: f64,
    close: f64,
    time: DateTime<Utc>,
}

/// Position ledger and fill history for one running strategy.
#[derive(Debug, Default)]
pub struct Session {
    pub ledger: PositionLedger,
    pub fills: Vec<Fill>,
}

/// Outcome of simulating one signal.
#[derive(Debug, Clone)]
pub enum FillOutcome {
    Filled(Fill),
    Rejected { reason: RejectReason },
}

/// Per-session summary for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub strategy_id: String,
    pub positions: BTreeMap<String, i64>,
    pub fill_count: usize,
}

/// Snapshot of the whole simulator for the control surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimSnapshot {
    pub sessions: Vec<SessionSummary>,
    pub total_fills: usize,
    pub config: SimConfig,
}

/// Validates signals against per-session position ledgers and computes
/// slippage-adjusted fills.
///
/// Pure and synchronous: no I/O mid-calculation. Owned by exactly one
/// task (`SimulatorService`), which serializes every mutation.
pub struct ExecutionSimulator {
    sessions: HashMap<String, Session>,
    quotes: HashMap<String, Quote>,
    config: SimConfig,
    next_fill_id: u64,
}

impl ExecutionSimulator {
    pub fn new(config: SimConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            quotes: HashMap::new(),
            config,
            next_fill_id: 1,
        }
    }

    /// Record the latest market prices for a symbol.
    pub fn update_quote(&mut self, bar: &Bar) {
        self.quotes.insert(
            bar.symbol.clone(),
            Quote {
                high: bar.high,
                low: bar.low,
                close: bar.close,
                time: bar.time,
            },
        );
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Merge a partial update into the config and return the result.
    pub fn apply_config(&mut self, patch: &SimConfigPatch) -> SimConfig {
        self.config.apply(patch);
        self.config.clone()
    }

    /// Simulate one signal against its session. The session is created
    /// lazily on the first signal for an unseen strategy id.
    ///
    /// Sells are validated against the ledger first: a flat book rejects,
    /// an oversized quantity is clamped. The base price prefers the latest
    /// quote for the symbol (by fill mode), falling back to the signal's
    /// own embedded price when the symbol has not been quoted yet.
    pub fn simulate_fill(&mut self, signal: &Signal) -> FillOutcome {
        let session = self.sessions.entry(signal.strategy_id.clone()).or_default();

        let quantity = match signal.action {
            SignalAction::Buy => signal.quantity,
            SignalAction::Sell => match session.ledger.check_sell(&signal.symbol, signal.quantity) {
                Ok(quantity) => quantity,
                Err(reason) => return FillOutcome::Rejected { reason },
            },
        };

        let quote = self.quotes.get(&signal.symbol).copied();
        let base_price = match quote {
            Some(q) => match (self.config.fill_mode, signal.action) {
                (FillMode::Conservative, SignalAction::Buy) => q.high,
                (FillMode::Conservative, SignalAction::Sell) => q.low,
                (FillMode::Optimistic, SignalAction::Buy) => q.low,
                (FillMode::Optimistic, SignalAction::Sell) => q.high,
                (FillMode::Mid, _) => q.close,
            },
            None => signal.price,
        };

        let slippage_amount = base_price * self.config.slippage_pct / 100.0;
        let price = match signal.action {
            SignalAction::Buy => base_price + slippage_amount,
            SignalAction::Sell => base_price - slippage_amount,
        };

        let position_after = session.ledger.apply(&signal.symbol, signal.action, quantity);

        let fill = Fill {
            fill_id: self.next_fill_id,
            strategy_id: signal.strategy_id.clone(),
            symbol: signal.symbol.clone(),
            action: signal.action,
            quantity,
            price,
            base_price,
            slippage_amount,
            commission: self.config.commission,
            position_after,
            timestamp: quote.map(|q| q.time).unwrap_or(signal.timestamp),
        };
        self.next_fill_id += 1;
        session.fills.push(fill.clone());

        FillOutcome::Filled(fill)
    }

    /// Clear one session. Returns whether it existed. The fill-id counter
    /// is not reset — fill ids stay strictly increasing process-wide.
    pub fn reset_session(&mut self, strategy_id: &str) -> bool {
        self.sessions.remove(strategy_id).is_some()
    }

    /// Clear all sessions. Returns how many were dropped.
    pub fn reset_all(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        count
    }

    pub fn session(&self, strategy_id: &str) -> Option<&Session> {
        self.sessions.get(strategy_id)
    }

    pub fn total_fills(&self) -> usize {
        self.sessions.values().map(|s| s.fills.len()).sum()
    }

    pub fn snapshot(&self) -> SimSnapshot {
        let mut sessions: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|(id, session)| SessionSummary {
                strategy_id: id.clone(),
                positions: session
                    .ledger
                    .iter()
                    .map(|(symbol, qty)| (symbol.to_string(), qty))
                    .collect(),
                fill_count: session.fills.len(),
            })
            .collect();
        sessions.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));
        SimSnapshot {
            sessions,
            total_fills: self.total_fills(),
            config: self.config.clone(),
        }
    }
}
