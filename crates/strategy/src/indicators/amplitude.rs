use common::{Candle, Error, Result};

/// `high / low` of a single candle, a volatility proxy.
///
/// A non-positive low, a non-finite price, or `high < low` cannot come from a
/// real market and is reported as `Error::MalformedData`.
pub fn amplitude_ratio(candle: &Candle) -> Result<f64> {
    if !candle.low.is_finite() || !candle.high.is_finite() || candle.low <= 0.0 {
        return Err(Error::MalformedData(format!(
            "low={} high={} at {}",
            candle.low, candle.high, candle.open_time
        )));
    }
    if candle.high < candle.low {
        return Err(Error::MalformedData(format!(
            "high {} below low {} at {}",
            candle.high, candle.low, candle.open_time
        )));
    }
    Ok(candle.high / candle.low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(high: f64, low: f64) -> Candle {
        Candle { open_time: Utc::now(), open: low, high, low, close: high, volume: 1.0 }
    }

    #[test]
    fn flat_candle_is_exactly_one() {
        assert_eq!(amplitude_ratio(&candle(42.0, 42.0)).unwrap(), 1.0);
    }

    #[test]
    fn ratio_of_wide_candle() {
        let r = amplitude_ratio(&candle(120.0, 100.0)).unwrap();
        assert!((r - 1.2).abs() < 1e-12);
    }

    #[test]
    fn zero_low_is_malformed() {
        assert!(matches!(amplitude_ratio(&candle(1.0, 0.0)), Err(Error::MalformedData(_))));
    }

    #[test]
    fn inverted_candle_is_malformed() {
        assert!(matches!(amplitude_ratio(&candle(1.0, 2.0)), Err(Error::MalformedData(_))));
    }
}
