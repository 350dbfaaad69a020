use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One closed (or still forming, for the newest bar) OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar duration of a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "30m" => Ok(Interval::M30),
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            other => Err(Error::Config(format!("unsupported interval '{other}'"))),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// What the evaluator decided for one symbol in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    EnterLong,
    EnterShort,
    /// Amplitude gate passed on a scanner deployment (no direction).
    AmplitudeAlert,
    None,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::EnterLong => "enter_long",
            Action::EnterShort => "enter_short",
            Action::AmplitudeAlert => "amplitude_alert",
            Action::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient evaluator output. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub action: Action,
    /// Close of the newest bar in the evaluated series.
    pub trigger_price: f64,
    /// Largest amplitude ratio seen by the gate, if it was computed.
    pub amplitude: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

impl Signal {
    pub fn none(symbol: impl Into<String>, trigger_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            action: Action::None,
            trigger_price,
            amplitude: None,
            computed_at: Utc::now(),
        }
    }
}

/// A signal ready to be delivered to sinks.
///
/// `payload` is the dedup key: the action string for entry signals, the
/// message text for amplitude alerts.
#[derive(Debug, Clone)]
pub struct Alert {
    pub symbol: String,
    pub action: Action,
    pub trigger_price: f64,
    pub text: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    /// Series the signal was computed from, kept for chart sinks.
    pub candles: Vec<Candle>,
}

impl Alert {
    pub fn from_signal(signal: &Signal, candles: Vec<Candle>) -> Self {
        let text = match signal.action {
            Action::AmplitudeAlert => format!(
                "/set_symbols #{} - {:.2}",
                signal.symbol,
                signal.amplitude.unwrap_or(1.0)
            ),
            Action::EnterLong | Action::EnterShort | Action::None => format!(
                "{} {} @ {}",
                signal.action, signal.symbol, signal.trigger_price
            ),
        };
        let payload = match signal.action {
            Action::AmplitudeAlert => text.clone(),
            _ => signal.action.as_str().to_string(),
        };
        Self {
            symbol: signal.symbol.clone(),
            action: signal.action,
            trigger_price: signal.trigger_price,
            text,
            payload,
            created_at: signal.computed_at,
            candles,
        }
    }

    /// Replace the message text. Amplitude alerts dedup on their text, so
    /// their payload follows.
    pub fn with_text(mut self, text: String) -> Self {
        if self.action == Action::AmplitudeAlert {
            self.payload = text.clone();
        }
        self.text = text;
        self
    }
}
