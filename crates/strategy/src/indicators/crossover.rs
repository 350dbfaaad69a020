use super::at_offset;

/// Direction of a short-average transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cross {
    pub over: bool,
    pub under: bool,
}

/// Short-vs-long EMA transition, judged on closed bars only.
///
/// The bar at offset 2 (the newest *closed* bar, since offset 1 is still
/// forming) is the current state; the bar at offset 3 is the prior state.
/// Returns `None` when either series is shorter than 3 or a compared value
/// is not finite.
pub fn ema_crossover(short: &[f64], long: &[f64]) -> Option<Cross> {
    let curr_short = at_offset(short, 2)?;
    let curr_long = at_offset(long, 2)?;
    let prev_short = at_offset(short, 3)?;
    let prev_long = at_offset(long, 3)?;

    if ![curr_short, curr_long, prev_short, prev_long].iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(Cross {
        over: prev_short <= prev_long && curr_short > curr_long,
        under: prev_short >= prev_long && curr_short < curr_long,
    })
}

/// Short SMA against a fixed reference price, no lag bar.
pub fn sma_vs_reference(short_sma: f64, reference: f64) -> Option<Cross> {
    if !short_sma.is_finite() || !reference.is_finite() {
        return None;
    }
    Some(Cross {
        over: short_sma > reference,
        under: short_sma < reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cross_over_on_closed_bars() {
        // prior (offset 3): 9 <= 10, current (offset 2): 11 > 10, forming bar ignored
        let short = [8.0, 9.0, 11.0, 5.0];
        let long = [10.0, 10.0, 10.0, 10.0];
        let cross = ema_crossover(&short, &long).unwrap();
        assert!(cross.over);
        assert!(!cross.under);
    }

    #[test]
    fn detects_cross_under() {
        let short = [11.0, 9.0, 0.0];
        let long = [10.0, 10.0, 10.0];
        let cross = ema_crossover(&short, &long).unwrap();
        assert!(cross.under);
        assert!(!cross.over);
    }

    #[test]
    fn no_cross_while_trend_persists() {
        let short = [11.0, 12.0, 13.0];
        let long = [10.0, 10.0, 10.0];
        assert_eq!(ema_crossover(&short, &long).unwrap(), Cross::default());
    }

    #[test]
    fn too_short_or_nan_is_none() {
        assert!(ema_crossover(&[1.0, 2.0], &[1.0, 2.0]).is_none());
        assert!(ema_crossover(&[f64::NAN, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn reference_comparison() {
        assert_eq!(sma_vs_reference(101.0, 100.0), Some(Cross { over: true, under: false }));
        assert_eq!(sma_vs_reference(99.0, 100.0), Some(Cross { over: false, under: true }));
        assert_eq!(sma_vs_reference(100.0, 100.0), Some(Cross::default()));
        assert_eq!(sma_vs_reference(f64::NAN, 100.0), None);
    }
}
