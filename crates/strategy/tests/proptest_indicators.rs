use chrono::Utc;
use proptest::prelude::*;

use common::{Candle, Interval};
use strategy::indicators::{amplitude_ratio, ema, sma};
use strategy::{evaluate, AmplitudeGate, MarketSnapshot, Trigger};

fn candle(low: f64, spread: f64, close: f64) -> Candle {
    Candle {
        open_time: Utc::now(),
        open: close,
        high: low + spread,
        low,
        close,
        volume: 1.0,
    }
}

proptest! {
    /// Valid candles (high >= low > 0) never have a ratio below 1.
    #[test]
    fn amplitude_ratio_at_least_one(low in 0.000_001f64..1_000_000.0, spread in 0.0f64..1_000_000.0) {
        let r = amplitude_ratio(&candle(low, spread, low)).unwrap();
        prop_assert!(r >= 1.0);
    }

    /// The first EMA value is the first close, and period 1 is the identity.
    #[test]
    fn ema_seed_and_identity(closes in prop::collection::vec(0.01f64..100_000.0, 1..200), period in 1usize..50) {
        prop_assert_eq!(ema(&closes, 1).unwrap(), closes.clone());
        match ema(&closes, period) {
            Some(out) => {
                prop_assert_eq!(out.len(), closes.len());
                prop_assert_eq!(out[0], closes[0]);
            }
            None => prop_assert!(closes.len() < period),
        }
    }

    /// SMA is undefined for exactly the warm-up bars.
    #[test]
    fn sma_warmup_is_undefined(closes in prop::collection::vec(0.01f64..100_000.0, 0..100), period in 1usize..30) {
        let out = sma(&closes, period);
        prop_assert_eq!(out.len(), closes.len());
        for (i, v) in out.iter().enumerate() {
            prop_assert_eq!(v.is_some(), i + 1 >= period);
        }
    }

    /// Arbitrary positive series never make the evaluator fail or panic.
    #[test]
    fn evaluator_never_errors_on_valid_prices(
        closes in prop::collection::vec(0.01f64..100_000.0, 1..60),
        threshold in 1.0f64..1.5,
    ) {
        let candles: Vec<Candle> = closes.iter().map(|&c| candle(c, c * 0.05, c)).collect();
        let snap = MarketSnapshot::new(Interval::M1, candles);
        let gate = AmplitudeGate {
            interval: None,
            offsets: vec![2, 1],
            threshold,
            strict: false,
        };
        let trigger = Trigger::EmaCrossover { short: 3, long: 20 };
        prop_assert!(evaluate("BTC/USDT", &snap, &trigger, &gate).is_ok());
    }
}
