/// Simple moving average over the trailing `period` closes.
///
/// Output is aligned with `closes`; the first `period - 1` entries are `None`.
/// Returns all `None` for `period == 0`.
pub fn sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || closes.len() < period {
        return vec![None; closes.len()];
    }

    let mut out = vec![None; period - 1];
    let mut sum: f64 = closes[..period].iter().sum();
    out.push(finite(sum / period as f64));

    for i in period..closes.len() {
        sum += closes[i] - closes[i - period];
        out.push(finite(sum / period as f64));
    }
    out
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_undefined_for_warmup() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn sma_all_none_when_too_short() {
        assert_eq!(sma(&[1.0, 2.0], 3), vec![None, None]);
    }

    #[test]
    fn sma_period_zero_is_undefined() {
        assert_eq!(sma(&[1.0], 0), vec![None]);
    }
}
