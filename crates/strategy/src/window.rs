use std::collections::VecDeque;

/// Fixed-capacity rolling window of close prices with indicator derivation.
///
/// Pushed exactly once per bar by the owning strategy instance. When full,
/// the oldest price is evicted FIFO. Indicators return `None` until enough
/// history has accumulated — "not ready", not an error.
#[derive(Debug, Clone)]
pub struct IndicatorWindow {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl IndicatorWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be >= 1");
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a price, evicting the oldest when at capacity. O(1) amortized.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Simple moving average of the last `period` prices.
    pub fn sma(&self, period: usize) -> Option<f64> {
        if period == 0 || self.prices.len() < period {
            return None;
        }
        let sum: f64 = self.prices.iter().rev().take(period).sum();
        Some(sum / period as f64)
    }

    /// Exponential moving average with smoothing 2/(period+1), seeded by
    /// the SMA of the first `period` stored prices and folded across the
    /// rest of the window. Recomputed from the stored window on every call
    /// for reproducibility.
    pub fn ema(&self, period: usize) -> Option<f64> {
        if period == 0 || self.prices.len() < period {
            return None;
        }
        let k = 2.0 / (period as f64 + 1.0);
        let seed = self.prices.iter().take(period).sum::<f64>() / period as f64;
        let ema = self
            .prices
            .iter()
            .skip(period)
            .fold(seed, |ema, &price| price * k + ema * (1.0 - k));
        Some(ema)
    }

    /// RSI over the most recent `period + 1` prices: per-step deltas split
    /// into gain/loss series, averaged over `period` steps (plain averages,
    /// not Wilder smoothing). RSI = 100 when the average loss is zero.
    pub fn rsi(&self, period: usize) -> Option<f64> {
        if period == 0 || self.prices.len() < period + 1 {
            return None;
        }
        let skip = self.prices.len() - (period + 1);
        let mut gains = 0.0;
        let mut losses = 0.0;
        let mut prev: Option<f64> = None;
        for &price in self.prices.iter().skip(skip) {
            if let Some(prev) = prev {
                let change = price - prev;
                if change > 0.0 {
                    gains += change;
                } else {
                    losses += -change;
                }
            }
            prev = Some(price);
        }
        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;
        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn window_of(prices: &[f64]) -> IndicatorWindow {
        let mut w = IndicatorWindow::new(100);
        for &p in prices {
            w.push(p);
        }
        w
    }

    #[test]
    fn sma_returns_none_when_insufficient_data() {
        let w = window_of(&[100.0, 101.0]);
        assert!(w.sma(3).is_none());
    }

    #[test]
    fn sma_of_constant_prices_is_the_price() {
        let w = window_of(&[42.5; 20]);
        for period in 1..=20 {
            let sma = w.sma(period).unwrap();
            assert!((sma - 42.5).abs() < 1e-12, "sma({period}) = {sma}");
        }
    }

    #[test]
    fn sma_uses_only_the_most_recent_prices() {
        let w = window_of(&[1.0, 2.0, 3.0, 4.0]);
        assert!((w.sma(2).unwrap() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn eviction_keeps_length_at_capacity() {
        let mut w = IndicatorWindow::new(3);
        for i in 0..10 {
            w.push(i as f64);
        }
        assert_eq!(w.len(), 3);
        // oldest evicted: remaining are 7, 8, 9
        assert!((w.sma(3).unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn ema_seed_equals_sma_at_exact_period() {
        let w = window_of(&[10.0, 11.0, 12.0]);
        let ema = w.ema(3).unwrap();
        let sma = w.sma(3).unwrap();
        assert!((ema - sma).abs() < 1e-12);
    }

    #[test]
    fn ema_known_value() {
        // seed = sma(1, 2) = 1.5; k = 2/3; ema = 3*2/3 + 1.5*1/3 = 2.5
        let w = window_of(&[1.0, 2.0, 3.0]);
        let ema = w.ema(2).unwrap();
        assert!((ema - 2.5).abs() < 1e-12, "ema = {ema}");
    }

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let w = window_of(&[100.0; 14]);
        assert!(w.rsi(14).is_none());
        assert!(window_of(&[100.0; 15]).rsi(14).is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let w = window_of(&[10.0, 11.0, 12.0, 13.0]);
        let rsi = w.rsi(3).unwrap();
        assert!((rsi - 100.0).abs() < 1e-9, "rsi = {rsi}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let w = window_of(&[13.0, 12.0, 11.0, 10.0]);
        let rsi = w.rsi(3).unwrap();
        assert!(rsi.abs() < 1e-9, "rsi = {rsi}");
    }

    #[test]
    fn rsi_flat_prices_return_100() {
        // zero average loss is defined as RSI = 100, not an error
        let w = window_of(&[50.0; 16]);
        assert_eq!(w.rsi(14).unwrap(), 100.0);
    }

    #[test]
    fn rsi_balanced_moves_near_50() {
        let w = window_of(&[100.0, 101.0, 100.0, 101.0, 100.0]);
        let rsi = w.rsi(4).unwrap();
        assert!((rsi - 50.0).abs() < 1.0, "rsi = {rsi}");
    }

    #[test]
    fn rsi_uses_only_last_period_plus_one_prices() {
        // the big drop at the start is outside the 3+1 lookback
        let w = window_of(&[500.0, 10.0, 11.0, 12.0, 13.0]);
        assert!((w.rsi(3).unwrap() - 100.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn rsi_is_always_bounded(prices in prop::collection::vec(0.01f64..10_000.0, 15..60)) {
            let w = window_of(&prices);
            if let Some(rsi) = w.rsi(14) {
                prop_assert!((0.0..=100.0).contains(&rsi), "RSI out of range: {rsi}");
            }
        }

        #[test]
        fn window_never_exceeds_capacity(
            capacity in 1usize..50,
            prices in prop::collection::vec(0.01f64..1000.0, 0..200),
        ) {
            let mut w = IndicatorWindow::new(capacity);
            for p in prices {
                w.push(p);
                prop_assert!(w.len() <= capacity);
            }
        }
    }
}
