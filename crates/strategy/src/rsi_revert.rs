use serde_json::{json, Map, Value};
use tracing::info;

use common::{Bar, Error, Result, Signal, SignalAction};

use crate::params::{merge_params, param_bool, param_f64, param_period, round2, trade_params};
use crate::window::IndicatorWindow;
use crate::Strategy;

pub const NAME: &str = "rsi";
pub const DESCRIPTION: &str =
    "Mean reversion on RSI extremes: buys oversold conditions, sells overbought ones. \
     Confirmation mode waits for RSI to leave the extreme zone before signaling.";

pub fn defaults() -> Value {
    json!({
        "symbol": "SPY",
        "quantity": 100,
        "rsi_period": 14,
        "oversold_threshold": 30.0,
        "overbought_threshold": 70.0,
        "use_confirmation": true,
    })
}

/// RSI mean-reversion with two entry modes, fixed at construction.
///
/// Zone-entry flags go sticky the bar RSI crosses a threshold and stay set
/// until consumed by a signal. In confirmation mode (default) the signal
/// waits for RSI to move back out of the extreme zone; in immediate mode it
/// fires on the crossing bar itself.
#[derive(Debug)]
pub struct RsiReversion {
    strategy_id: String,
    symbol: String,
    quantity: i64,
    rsi_period: usize,
    oversold: f64,
    overbought: f64,
    use_confirmation: bool,
    window: IndicatorWindow,
    last_rsi: Option<f64>,
    in_oversold: bool,
    in_overbought: bool,
    long: bool,
}

impl RsiReversion {
    pub fn new(strategy_id: impl Into<String>, params: &Map<String, Value>) -> Result<Self> {
        let params = merge_params(&defaults(), params);
        let (symbol, quantity) = trade_params(&params)?;
        let rsi_period = param_period(&params, "rsi_period")?;
        let oversold = param_f64(&params, "oversold_threshold")?;
        let overbought = param_f64(&params, "overbought_threshold")?;
        let use_confirmation = param_bool(&params, "use_confirmation")?;

        if rsi_period < 2 {
            return Err(Error::InvalidParameters("rsi_period must be at least 2".into()));
        }
        if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
            return Err(Error::InvalidParameters(
                "thresholds must satisfy 0 < oversold < overbought < 100".into(),
            ));
        }

        Ok(Self {
            strategy_id: strategy_id.into(),
            symbol,
            quantity,
            rsi_period,
            oversold,
            overbought,
            use_confirmation,
            window: IndicatorWindow::new(100.max(rsi_period + 20)),
            last_rsi: None,
            in_oversold: false,
            in_overbought: false,
            long: false,
        })
    }

    /// Confirmation mode: signal when RSI moves back out of an armed
    /// extreme zone.
    fn confirmation_signal(&mut self, bar: &Bar, rsi: f64) -> Option<Signal> {
        if self.in_oversold && rsi > self.oversold && !self.long {
            self.long = true;
            self.in_oversold = false;
            return Some(
                Signal::from_bar(
                    &self.strategy_id,
                    &self.symbol,
                    SignalAction::Buy,
                    self.quantity,
                    bar,
                    0.8,
                    "rsi_oversold_recovery",
                )
                .with_meta("rsi", round2(rsi))
                .with_meta("signal_mode", "confirmation"),
            );
        }

        if self.in_overbought && rsi < self.overbought && self.long {
            self.long = false;
            self.in_overbought = false;
            return Some(
                Signal::from_bar(
                    &self.strategy_id,
                    &self.symbol,
                    SignalAction::Sell,
                    self.quantity,
                    bar,
                    0.8,
                    "rsi_overbought_reversal",
                )
                .with_meta("rsi", round2(rsi))
                .with_meta("signal_mode", "confirmation"),
            );
        }

        None
    }

    /// Immediate mode: signal on the bar RSI crosses into an extreme zone.
    fn immediate_signal(&mut self, bar: &Bar, rsi: f64) -> Option<Signal> {
        let crossed_down = rsi < self.oversold && self.last_rsi.map_or(true, |p| p >= self.oversold);
        if crossed_down && !self.long {
            self.long = true;
            return Some(
                Signal::from_bar(
                    &self.strategy_id,
                    &self.symbol,
                    SignalAction::Buy,
                    self.quantity,
                    bar,
                    0.75,
                    "rsi_oversold",
                )
                .with_meta("rsi", round2(rsi))
                .with_meta("signal_mode", "immediate"),
            );
        }

        let crossed_up = rsi > self.overbought && self.last_rsi.map_or(true, |p| p <= self.overbought);
        if crossed_up && self.long {
            self.long = false;
            return Some(
                Signal::from_bar(
                    &self.strategy_id,
                    &self.symbol,
                    SignalAction::Sell,
                    self.quantity,
                    bar,
                    0.75,
                    "rsi_overbought",
                )
                .with_meta("rsi", round2(rsi))
                .with_meta("signal_mode", "immediate"),
            );
        }

        None
    }
}

impl Strategy for RsiReversion {
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

        let rsi = self.window.rsi(self.rsi_period)?;

        // zone flags arm as soon as RSI crosses a threshold, and stay
        // armed until a signal consumes them
        if rsi < self.oversold {
            self.in_oversold = true;
        }
        if rsi > self.overbought {
            self.in_overbought = true;
        }

        let signal = if self.use_confirmation {
            self.confirmation_signal(bar, rsi)
        } else {
            self.immediate_signal(bar, rsi)
        };

        self.last_rsi = Some(rsi);
        signal
    }

    fn on_start(&self) {
        info!(
            strategy = %self.strategy_id,
            symbol = %self.symbol,
            period = self.rsi_period,
            oversold = self.oversold,
            overbought = self.overbought,
            mode = if self.use_confirmation { "confirmation" } else { "immediate" },
            "RSI strategy starting"
        );
    }

    fn on_stop(&self) {
        info!(
            strategy = %self.strategy_id,
            rsi = self.last_rsi.map(round2),
            position = if self.long { "long" } else { "flat" },
            "RSI strategy stopping"
        );
    }

    fn snapshot(&self) -> Value {
        json!({
            "rsi": self.last_rsi.map(round2),
            "position": if self.long { Some("long") } else { None },
            "in_oversold_zone": self.in_oversold,
            "in_overbought_zone": self.in_overbought,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

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

    fn rsi2(confirmation: bool) -> RsiReversion {
        let params = json!({
            "rsi_period": 2,
            "use_confirmation": confirmation,
        });
        RsiReversion::new("rsi-test", params.as_object().unwrap()).unwrap()
    }

    #[test]
    fn rejects_bad_thresholds() {
        let params = json!({ "oversold_threshold": 80.0, "overbought_threshold": 70.0 });
        let err = RsiReversion::new("rsi-bad", params.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn rejects_period_below_two() {
        let params = json!({ "rsi_period": 1 });
        assert!(RsiReversion::new("rsi-bad", params.as_object().unwrap()).is_err());
    }

    #[test]
    fn confirmation_buys_at_recovery_not_at_dip() {
        let mut s = rsi2(true);
        // 100, 99, 98: two straight losses drive RSI to 0 (the dip bar);
        // 101 recovers RSI above the oversold threshold (the recovery bar)
        assert!(s.process_bar(&bar(100.0)).is_none());
        assert!(s.process_bar(&bar(99.0)).is_none());
        assert!(s.process_bar(&bar(98.0)).is_none(), "no signal at the dip bar");

        let signal = s.process_bar(&bar(101.0)).expect("BUY at the recovery bar");
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.reason, "rsi_oversold_recovery");
    }

    #[test]
    fn confirmation_sells_when_overbought_fades_while_long() {
        let mut s = rsi2(true);
        for close in [100.0, 99.0, 98.0] {
            s.process_bar(&bar(close));
        }
        assert!(s.process_bar(&bar(101.0)).is_some()); // BUY, now long

        // rally keeps RSI pinned high, arming the overbought zone
        assert!(s.process_bar(&bar(104.0)).is_none());
        assert!(s.process_bar(&bar(107.0)).is_none());

        // sharp drop takes RSI back below the overbought threshold
        let signal = s.process_bar(&bar(100.0)).expect("SELL on the fade");
        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.reason, "rsi_overbought_reversal");
    }

    #[test]
    fn confirmation_buy_fires_only_once_per_zone_visit() {
        let mut s = rsi2(true);
        for close in [100.0, 99.0, 98.0] {
            s.process_bar(&bar(close));
        }
        assert!(s.process_bar(&bar(101.0)).is_some());
        // further mild recovery bars must not re-fire: zone flag consumed
        assert!(s.process_bar(&bar(101.5)).is_none());
        assert!(s.process_bar(&bar(102.0)).is_none());
    }

    #[test]
    fn immediate_buys_on_the_crossing_bar() {
        let mut s = rsi2(false);
        assert!(s.process_bar(&bar(100.0)).is_none());
        assert!(s.process_bar(&bar(99.0)).is_none());

        // first computable RSI is 0: crossing into oversold fires at once
        let signal = s.process_bar(&bar(98.0)).expect("immediate BUY at the dip");
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.reason, "rsi_oversold");
        assert_eq!(signal.metadata["signal_mode"], "immediate");
    }

    #[test]
    fn immediate_sell_requires_long_position() {
        let mut s = rsi2(false);
        // straight rally: RSI pinned at 100, but there is no position
        for close in [100.0, 101.0, 102.0, 103.0, 104.0] {
            assert!(s.process_bar(&bar(close)).is_none());
        }
    }

    #[test]
    fn no_signal_before_rsi_is_computable() {
        let mut s = rsi2(true);
        assert!(s.process_bar(&bar(10.0)).is_none());
        assert!(s.process_bar(&bar(5.0)).is_none());
    }
}
