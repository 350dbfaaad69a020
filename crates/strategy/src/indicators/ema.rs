/// Exponential moving average of `closes` (oldest first).
///
/// Smoothing factor `2 / (period + 1)`, seeded with the first close rather
/// than an SMA warm-up: `ema[0] = closes[0]`,
/// `ema[i] = closes[i] * k + ema[i-1] * (1 - k)`.
///
/// Returns `None` when `period == 0`, when there are fewer than `period`
/// closes, or when any close is not finite.
pub fn ema(closes: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || closes.len() < period || closes.is_empty() {
        return None;
    }
    if closes.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = closes[0];
    out.push(prev);
    for &close in &closes[1..] {
        prev = close * k + prev * (1.0 - k);
        out.push(prev);
    }
    Some(out)
}
