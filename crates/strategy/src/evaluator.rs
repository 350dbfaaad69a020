use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use common::{Action, Candle, Error, Interval, Result, Signal};

use crate::config::{AmplitudeGate, Trigger};
use crate::indicators::{amplitude_ratio, at_offset, ema, ema_crossover, sma, sma_vs_reference};

/// All candle series fetched for one symbol in one cycle.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub interval: Interval,
    pub candles: Vec<Candle>,
    pub extra: HashMap<Interval, Vec<Candle>>,
}

impl MarketSnapshot {
    pub fn new(interval: Interval, candles: Vec<Candle>) -> Self {
        Self { interval, candles, extra: HashMap::new() }
    }

    pub fn with_series(mut self, interval: Interval, candles: Vec<Candle>) -> Self {
        if interval == self.interval {
            self.candles = candles;
        } else {
            self.extra.insert(interval, candles);
        }
        self
    }

    /// Series for `interval`; `None` selects the signal series.
    pub fn series(&self, interval: Option<Interval>) -> Result<&[Candle]> {
        match interval {
            None => Ok(&self.candles),
            Some(i) if i == self.interval => Ok(&self.candles),
            Some(i) => self
                .extra
                .get(&i)
                .map(Vec::as_slice)
                .ok_or_else(|| Error::DataUnavailable(format!("no {i} series in snapshot"))),
        }
    }
}

/// Decide the action for one symbol from already-fetched data. No I/O.
///
/// The gate runs first; a closed gate yields `Action::None` regardless of
/// the trigger. Undefined indicator values (short series, NaN) also yield
/// `Action::None`. Only impossible prices are errors.
pub fn evaluate(
    symbol: &str,
    snapshot: &MarketSnapshot,
    trigger: &Trigger,
    gate: &AmplitudeGate,
) -> Result<Signal> {
    let candles = &snapshot.candles;
    let last = candles
        .last()
        .ok_or_else(|| Error::DataUnavailable(format!("empty {} series", snapshot.interval)))?;
    let mut signal = Signal::none(symbol, last.close);

    let Some(amplitude) = gate_ratio(snapshot, gate)? else {
        debug!(symbol, "Not enough bars for amplitude gate");
        return Ok(signal);
    };
    signal.amplitude = Some(amplitude);

    if !gate.passes(amplitude) {
        debug!(symbol, amplitude, threshold = gate.threshold, "Amplitude gate closed");
        return Ok(signal);
    }

    let action = match trigger {
        Trigger::Amplitude => Action::AmplitudeAlert,
        Trigger::EmaCrossover { short, long } => {
            if candles.len() < trigger.required_bars() {
                debug!(symbol, bars = candles.len(), "Not enough bars for EMA crossover");
                return Ok(signal);
            }
            let closes = closes(candles);
            match (ema(&closes, *short), ema(&closes, *long)) {
                (Some(s), Some(l)) => entry_action(ema_crossover(&s, &l)),
                _ => Action::None,
            }
        }
        Trigger::SmaVsReference { period, reference_interval, reference_offset } => {
            let averages = sma(&closes(candles), *period);
            let short = at_offset(&averages, 2).flatten();
            let reference_series = snapshot.series(Some(*reference_interval))?;
            let reference = at_offset(reference_series, *reference_offset).map(|c| c.close);
            match (short, reference) {
                (Some(s), Some(r)) => entry_action(sma_vs_reference(s, r)),
                _ => Action::None,
            }
        }
    };
    signal.action = action;
    signal.computed_at = Utc::now();
    Ok(signal)
}

/// Largest amplitude ratio among the gate's bars, or `None` if any is missing.
fn gate_ratio(snapshot: &MarketSnapshot, gate: &AmplitudeGate) -> Result<Option<f64>> {
    let series = snapshot.series(gate.interval)?;
    let mut best: Option<f64> = None;
    for &offset in &gate.offsets {
        let Some(candle) = at_offset(series, offset) else {
            return Ok(None);
        };
        let ratio = amplitude_ratio(&candle)?;
        best = Some(best.map_or(ratio, |b: f64| b.max(ratio)));
    }
    Ok(best)
}

/// Over wins if both flags are somehow set.
fn entry_action(cross: Option<crate::indicators::Cross>) -> Action {
    match cross {
        Some(c) if c.over => Action::EnterLong,
        Some(c) if c.under => Action::EnterShort,
        _ => Action::None,
    }
}

fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
