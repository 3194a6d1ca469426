use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV price sample for a fixed time interval, replayed from
/// recorded market data. Bars arrive in nondecreasing time order per
/// symbol; that ordering is assumed, not validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Direction of a trade recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "BUY"),
            SignalAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A strategy's trade recommendation, prior to execution.
/// Immutable once emitted; never mutated downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub strategy_id: String,
    pub symbol: String,
    pub action: SignalAction,
    /// Number of shares, always > 0 (validated at strategy creation).
    pub quantity: i64,
    /// Close price of the bar that triggered the signal.
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// The strategy's conviction, in [0, 1].
    pub confidence: f64,
    pub reason: String,
    /// Variant-specific fields (indicator values, crossover labels),
    /// flattened into the serialized object.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Signal {
    /// Build a signal from the triggering bar: price is the bar close,
    /// timestamp the bar time.
    pub fn from_bar(
        strategy_id: &str,
        symbol: &str,
        action: SignalAction,
        quantity: i64,
        bar: &Bar,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            strategy_id: strategy_id.to_string(),
            symbol: symbol.to_string(),
            action,
            quantity,
            price: bar.close,
            timestamp: bar.time,
            confidence,
            reason: reason.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach one variant-specific metadata field.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A simulated completed trade with realized price and post-trade position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Strictly increasing across the whole process, including resets.
    pub fill_id: u64,
    pub strategy_id: String,
    pub symbol: String,
    pub action: SignalAction,
    pub quantity: i64,
    /// Realized price: base price adjusted for slippage.
    pub price: f64,
    pub base_price: f64,
    pub slippage_amount: f64,
    pub commission: f64,
    pub position_after: i64,
    pub timestamp: DateTime<Utc>,
}

/// Emitted instead of a fill when the position ledger rejects a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    pub strategy_id: String,
    pub reason: String,
    pub signal: Signal,
    pub timestamp: DateTime<Utc>,
}

/// Event published by the execution simulator, keyed by strategy id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ExecutionEvent {
    Fill(Fill),
    Rejection(Rejection),
}

/// Which bar price anchors a simulated fill before slippage.
///
/// `Conservative` fills buys at the bar high and sells at the bar low;
/// `Optimistic` inverts that; `Mid` uses the close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    #[default]
    Conservative,
    Optimistic,
    Mid,
}

impl std::fmt::Display for FillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillMode::Conservative => write!(f, "conservative"),
            FillMode::Optimistic => write!(f, "optimistic"),
            FillMode::Mid => write!(f, "mid"),
        }
    }
}

impl std::str::FromStr for FillMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conservative" => Ok(FillMode::Conservative),
            "optimistic" => Ok(FillMode::Optimistic),
            "mid" => Ok(FillMode::Mid),
            other => Err(crate::Error::Config(format!(
                "fill mode must be 'conservative', 'optimistic' or 'mid', got: '{other}'"
            ))),
        }
    }
}
