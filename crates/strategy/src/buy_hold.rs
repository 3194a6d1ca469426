use serde_json::{json, Map, Value};
use tracing::info;

use common::{Bar, Result, Signal, SignalAction};

use crate::params::{merge_params, trade_params};
use crate::window::IndicatorWindow;
use crate::Strategy;

pub const NAME: &str = "buy_hold";
pub const DESCRIPTION: &str =
    "Buys once on the first bar and holds. Baseline benchmark for other strategies.";

pub fn defaults() -> Value {
    json!({
        "symbol": "SPY",
        "quantity": 100,
    })
}

/// Buys `quantity` shares on the first bar it ever processes and emits
/// nothing thereafter, for the lifetime of the instance.
#[derive(Debug)]
pub struct BuyAndHold {
    strategy_id: String,
    symbol: String,
    quantity: i64,
    window: IndicatorWindow,
    has_bought: bool,
}

impl BuyAndHold {
    pub fn new(strategy_id: impl Into<String>, params: &Map<String, Value>) -> Result<Self> {
        let params = merge_params(&defaults(), params);
        let (symbol, quantity) = trade_params(&params)?;
        Ok(Self {
            strategy_id: strategy_id.into(),
            symbol,
            quantity,
            window: IndicatorWindow::new(100),
            has_bought: false,
        })
    }
}

impl Strategy for BuyAndHold {
    fn strategy_type(&self) -> &'static str {
        NAME
    }

    fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn process_bar(&mut self, bar: &Bar) -> Option<Signal> {
        self.window.push(bar.close);

        if self.has_bought {
            return None;
        }
        self.has_bought = true;

        Some(Signal::from_bar(
            &self.strategy_id,
            &self.symbol,
            SignalAction::Buy,
            self.quantity,
            bar,
            1.0,
            "initial_buy",
        ))
    }

    fn on_start(&self) {
        info!(
            strategy = %self.strategy_id,
            symbol = %self.symbol,
            quantity = self.quantity,
            "Buy & hold starting"
        );
    }

    fn on_stop(&self) {
        if self.has_bought {
            info!(strategy = %self.strategy_id, "Buy & hold stopping — position held throughout");
        } else {
            info!(strategy = %self.strategy_id, "Buy & hold stopping — no position taken");
        }
    }

    fn snapshot(&self) -> Value {
        json!({
            "has_bought": self.has_bought,
            "bars_seen": self.window.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(close: f64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            time: Utc::now(),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn emits_exactly_one_buy_across_many_bars() {
        let mut s = BuyAndHold::new("bh-1", &Map::new()).unwrap();

        let first = s.process_bar(&bar(100.0)).expect("first bar must buy");
        assert_eq!(first.action, SignalAction::Buy);
        assert_eq!(first.quantity, 100);
        assert_eq!(first.reason, "initial_buy");

        for i in 0..50 {
            assert!(s.process_bar(&bar(100.0 + i as f64)).is_none());
        }
    }

    #[test]
    fn quantity_comes_from_params() {
        let params = serde_json::json!({ "quantity": 25, "symbol": "QQQ" });
        let mut s = BuyAndHold::new("bh-2", params.as_object().unwrap()).unwrap();
        let signal = s.process_bar(&bar(10.0)).unwrap();
        assert_eq!(signal.quantity, 25);
        assert_eq!(signal.symbol, "QQQ");
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let params = serde_json::json!({ "quantity": -5 });
        assert!(BuyAndHold::new("bh-3", params.as_object().unwrap()).is_err());
    }
}
