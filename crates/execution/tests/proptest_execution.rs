use chrono::Utc;
use proptest::prelude::*;

use common::{Bar, Fill, FillMode, Signal, SignalAction};
use execution::{ExecutionSimulator, FillOutcome, SimConfig};

fn bar(symbol: &str, price: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        time: Utc::now(),
        open: price,
        high: price * 1.01,
        low: price * 0.99,
        close: price,
        volume: 1000,
    }
}

fn signal(action: SignalAction, quantity: i64, price: f64) -> Signal {
    Signal {
        strategy_id: "prop".into(),
        symbol: "TEST".into(),
        action,
        quantity,
        price,
        timestamp: Utc::now(),
        confidence: 1.0,
        reason: "prop".into(),
        metadata: Default::default(),
    }
}

fn must_fill(outcome: FillOutcome) -> Fill {
    match outcome {
        FillOutcome::Filled(fill) => fill,
        FillOutcome::Rejected { reason } => panic!("expected fill, got rejection: {reason}"),
    }
}

fn fill_mode_strategy() -> impl Strategy<Value = FillMode> {
    prop_oneof![
        Just(FillMode::Conservative),
        Just(FillMode::Optimistic),
        Just(FillMode::Mid),
    ]
}

proptest! {
    /// Across arbitrary buy/sell sequences the ledger can never go short:
    /// sells against a flat book reject, oversized sells clamp to the
    /// position, and every fill reports a non-negative resulting position.
    #[test]
    fn positions_never_go_negative(
        ops in prop::collection::vec(
            (any::<bool>(), 1i64..500, 0.01f64..10_000.0),
            1..60,
        ),
        mode in fill_mode_strategy(),
    ) {
        let mut sim = ExecutionSimulator::new(SimConfig {
            fill_mode: mode,
            ..SimConfig::default()
        });

        let mut expected_position = 0i64;
        for (is_buy, quantity, price) in ops {
            sim.update_quote(&bar("TEST", price));
            let action = if is_buy { SignalAction::Buy } else { SignalAction::Sell };

            match sim.simulate_fill(&signal(action, quantity, price)) {
                FillOutcome::Filled(fill) => {
                    match action {
                        SignalAction::Buy => expected_position += fill.quantity,
                        SignalAction::Sell => expected_position -= fill.quantity,
                    }
                    prop_assert!(fill.position_after >= 0);
                    prop_assert_eq!(fill.position_after, expected_position);
                    prop_assert!(fill.quantity >= 1);
                }
                FillOutcome::Rejected { .. } => {
                    prop_assert!(!is_buy, "buys are never rejected");
                    prop_assert!(expected_position <= 0);
                }
            }
        }
    }

    /// Buys always pay above the base price and sells always receive below
    /// it, by exactly base_price * slippage_pct / 100, in every fill mode.
    #[test]
    fn slippage_sign_and_magnitude_hold(
        price in 0.01f64..100_000.0,
        slippage_pct in 0.0f64..5.0,
        mode in fill_mode_strategy(),
    ) {
        let mut sim = ExecutionSimulator::new(SimConfig {
            slippage_pct,
            commission: 0.0,
            fill_mode: mode,
        });
        sim.update_quote(&bar("TEST", price));

        let buy = must_fill(sim.simulate_fill(&signal(SignalAction::Buy, 100, price)));
        let expected = buy.base_price * slippage_pct / 100.0;
        prop_assert!((buy.slippage_amount - expected).abs() < 1e-9);
        prop_assert!((buy.price - (buy.base_price + expected)).abs() < 1e-9);

        let sell = must_fill(sim.simulate_fill(&signal(SignalAction::Sell, 100, price)));
        let expected = sell.base_price * slippage_pct / 100.0;
        prop_assert!((sell.price - (sell.base_price - expected)).abs() < 1e-9);
    }

    /// Fill ids stay strictly increasing no matter how sessions are reset.
    #[test]
    fn fill_ids_are_monotonic(
        trades in prop::collection::vec((1i64..100, prop::bool::ANY), 1..40),
    ) {
        let mut sim = ExecutionSimulator::new(SimConfig::default());
        sim.update_quote(&bar("TEST", 100.0));

        let mut last_id = 0u64;
        for (quantity, reset_after) in trades {
            if let FillOutcome::Filled(fill) =
                sim.simulate_fill(&signal(SignalAction::Buy, quantity, 100.0))
            {
                prop_assert!(fill.fill_id > last_id);
                last_id = fill.fill_id;
            }
            if reset_after {
                sim.reset_all();
            }
        }
    }
}
