use std::collections::HashMap;

use common::SignalAction;

/// Reason the simulator turned a signal away instead of filling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoPositionToSell,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NoPositionToSell => write!(f, "no position to sell"),
        }
    }
}

/// Signed share count per symbol for one session.
///
/// Sells are validated before they are applied: a sell against a flat or
/// short book is rejected, and an oversized sell is clamped to the current
/// position rather than rejected outright.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: HashMap<String, i64>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current signed share count for `symbol` (0 when never traded).
    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    /// Validate a sell of `quantity` shares against the current position.
    /// Returns the fillable quantity, clamped to the position.
    pub fn check_sell(&self, symbol: &str, quantity: i64) -> Result<i64, RejectReason> {
        let position = self.position(symbol);
        if position <= 0 {
            return Err(RejectReason::NoPositionToSell);
        }
        Ok(quantity.min(position))
    }

    /// Apply a filled trade and return the resulting position.
    pub fn apply(&mut self, symbol: &str, action: SignalAction, quantity: i64) -> i64 {
        let entry = self.positions.entry(symbol.to_string()).or_insert(0);
        match action {
            SignalAction::Buy => *entry += quantity,
            SignalAction::Sell => *entry -= quantity,
        }
        *entry
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.positions.iter().map(|(symbol, &qty)| (symbol.as_str(), qty))
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
