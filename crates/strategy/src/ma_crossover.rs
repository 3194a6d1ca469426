use serde_json::{json, Map, Value};
use tracing::info;

use common::{Bar, Error, Result, Signal, SignalAction};

use crate::params::{merge_params, param_period, param_str, round2, trade_params};
use crate::window::IndicatorWindow;
use crate::Strategy;

pub const NAME: &str = "ma_cross";
pub const DESCRIPTION: &str =
    "Buys when the fast moving average crosses above the slow one (golden cross), \
     sells when it crosses back below (death cross).";

pub fn defaults() -> Value {
    json!({
        "symbol": "SPY",
        "quantity": 100,
        "fast_period": 20,
        "slow_period": 50,
        "ma_type": "sma",
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaType {
    Sma,
    Ema,
}

impl MaType {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "sma" => Ok(MaType::Sma),
            "ema" => Ok(MaType::Ema),
            other => Err(Error::InvalidParameters(format!(
                "'ma_type' must be 'sma' or 'ema', got '{other}'"
            ))),
        }
    }

    fn label(self) -> &'static str {
        match self {
            MaType::Sma => "SMA",
            MaType::Ema => "EMA",
        }
    }
}

/// Sign of (fast MA − slow MA) once both are computable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaSide {
    Above,
    Below,
}

impl MaSide {
    fn label(self) -> &'static str {
        match self {
            MaSide::Above => "above",
            MaSide::Below => "below",
        }
    }
}

/// Moving-average crossover state machine.
///
/// Tracks which side of the slow MA the fast MA sits on and fires only on
/// a transition: below→above buys (when flat), above→below sells (when
/// long). The very first computable state never fires — there is no prior
/// state to compare against.
#[derive(Debug)]
pub struct MaCrossover {
    strategy_id: String,
    symbol: String,
    quantity: i64,
    fast_period: usize,
    slow_period: usize,
    ma_type: MaType,
    window: IndicatorWindow,
    prev_side: Option<MaSide>,
    long: bool,
    last_fast: Option<f64>,
    last_slow: Option<f64>,
}

impl MaCrossover {
    pub fn new(strategy_id: impl Into<String>, params: &Map<String, Value>) -> Result<Self> {
        let params = merge_params(&defaults(), params);
        let (symbol, quantity) = trade_params(&params)?;
        let fast_period = param_period(&params, "fast_period")?;
        let slow_period = param_period(&params, "slow_period")?;
        let ma_type = MaType::parse(&param_str(&params, "ma_type")?)?;

        if fast_period >= slow_period {
            return Err(Error::InvalidParameters(format!(
                "fast_period must be less than slow_period ({fast_period} >= {slow_period})"
            )));
        }

        Ok(Self {
            strategy_id: strategy_id.into(),
            symbol,
            quantity,
            fast_period,
            slow_period,
            ma_type,
            window: IndicatorWindow::new(100.max(slow_period + 10)),
            prev_side: None,
            long: false,
            last_fast: None,
            last_slow: None,
        })
    }

    fn averages(&self) -> Option<(f64, f64)> {
        match self.ma_type {
            MaType::Sma => Some((self.window.sma(self.fast_period)?, self.window.sma(self.slow_period)?)),
            MaType::Ema => Some((self.window.ema(self.fast_period)?, self.window.ema(self.slow_period)?)),
        }
    }
}

impl Strategy for MaCrossover {
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

        if self.window.len() < self.slow_period {
            return None;
        }
        let (fast, slow) = self.averages()?;
        self.last_fast = Some(fast);
        self.last_slow = Some(slow);

        let side = if fast > slow { MaSide::Above } else { MaSide::Below };
        let prev = self.prev_side.replace(side);

        let crossed = matches!(prev, Some(prev) if prev != side);
        if !crossed {
            return None;
        }

        let ma = self.ma_type.label();
        match side {
            MaSide::Above if !self.long => {
                self.long = true;
                Some(
                    Signal::from_bar(
                        &self.strategy_id,
                        &self.symbol,
                        SignalAction::Buy,
                        self.quantity,
                        bar,
                        0.85,
                        format!(
                            "Fast {ma}({}) crossed above Slow {ma}({})",
                            self.fast_period, self.slow_period
                        ),
                    )
                    .with_meta("fast_ma", round2(fast))
                    .with_meta("slow_ma", round2(slow))
                    .with_meta("crossover_type", "golden_cross")
                    .with_meta("ma_type", ma.to_lowercase()),
                )
            }
            MaSide::Below if self.long => {
                self.long = false;
                Some(
                    Signal::from_bar(
                        &self.strategy_id,
                        &self.symbol,
                        SignalAction::Sell,
                        self.quantity,
                        bar,
                        0.85,
                        format!(
                            "Fast {ma}({}) crossed below Slow {ma}({})",
                            self.fast_period, self.slow_period
                        ),
                    )
                    .with_meta("fast_ma", round2(fast))
                    .with_meta("slow_ma", round2(slow))
                    .with_meta("crossover_type", "death_cross")
                    .with_meta("ma_type", ma.to_lowercase()),
                )
            }
            _ => None,
        }
    }

    fn on_start(&self) {
        info!(
            strategy = %self.strategy_id,
            symbol = %self.symbol,
            fast = self.fast_period,
            slow = self.slow_period,
            ma_type = self.ma_type.label(),
            "MA crossover starting"
        );
    }

    fn on_stop(&self) {
        info!(
            strategy = %self.strategy_id,
            position = if self.long { "long" } else { "flat" },
            "MA crossover stopping"
        );
    }

    fn snapshot(&self) -> Value {
        json!({
            "fast_ma": self.last_fast.map(round2),
            "slow_ma": self.last_slow.map(round2),
            "ma_relationship": self.prev_side.map(MaSide::label),
            "position": if self.long { Some("long") } else { None },
        })
    }
}
