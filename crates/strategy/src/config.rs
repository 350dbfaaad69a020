use serde::{Deserialize, Serialize};

use common::{Error, Interval, Result, MAX_FETCH_LIMIT};

/// Watch file (TOML): what to fetch, how to decide, where to send.
///
/// Example `config/watch.toml`:
/// ```toml
/// interval = "1m"
/// candle_limit = 500
/// poll_interval_secs = 20
/// allowed_symbols = ["BTC/USDT", "ETH/USDT"]
///
/// [trigger]
/// type = "ema_crossover"
/// short = 10
/// long = 200
///
/// [gate]
/// interval = "1d"
/// offsets = [2, 1]
/// threshold = 1.20
///
/// [notify]
/// tv_exchange = "bybit"
///
/// [[notify.webhook_bot]]
/// uuid = "00830f96-c475-4c3e-9e38-9a4495e3b78c"
/// secret_env = "WEBHOOK_SECRET_1"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Bar duration of the signal series.
    pub interval: Interval,
    /// Bars fetched for the signal series each cycle.
    pub candle_limit: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Symbols `/set_symbols` may add (matched case-insensitively).
    pub allowed_symbols: Vec<String>,
    /// Symbols tracked from startup, before any command arrives.
    #[serde(default)]
    pub initial_symbols: Vec<String>,
    pub trigger: Trigger,
    pub gate: AmplitudeGate,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Indicator condition that turns a gated cycle into an action.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Short EMA crossing the long EMA on the newest closed bar.
    EmaCrossover { short: usize, long: usize },
    /// Short SMA of the signal series against a close from another series
    /// (by default yesterday's daily close).
    SmaVsReference {
        period: usize,
        #[serde(default = "default_reference_interval")]
        reference_interval: Interval,
        #[serde(default = "default_reference_offset")]
        reference_offset: usize,
    },
    /// No indicator: the amplitude gate alone raises an alert.
    Amplitude,
}

/// Minimum-volatility gate applied before any trigger.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AmplitudeGate {
    /// Series the gate reads; `None` means the signal series.
    #[serde(default)]
    pub interval: Option<Interval>,
    /// Bar positions counted from the end (1 = newest). The gate passes if
    /// any of them reaches the threshold.
    #[serde(default = "default_offsets")]
    pub offsets: Vec<usize>,
    /// `high / low` threshold, e.g. 1.10. Inclusive unless `strict`.
    pub threshold: f64,
    /// Require the ratio to exceed the threshold rather than reach it.
    #[serde(default)]
    pub strict: bool,
}

impl AmplitudeGate {
    pub fn passes(&self, ratio: f64) -> bool {
        if self.strict {
            ratio > self.threshold
        } else {
            ratio >= self.threshold
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// Send alert text to the Telegram alert chats.
    #[serde(default)]
    pub telegram: bool,
    /// Attach a chart image to Telegram alerts (needs a renderer).
    #[serde(default)]
    pub chart: bool,
    /// Replaces the default amplitude alert text. `{symbol}` and `{ratio}`
    /// (two decimals) are substituted.
    #[serde(default)]
    pub alert_template: Option<String>,
    #[serde(default = "default_tv_exchange")]
    pub tv_exchange: String,
    #[serde(default, rename = "webhook_bot")]
    pub webhook_bots: Vec<WebhookBot>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram: false,
            chart: false,
            alert_template: None,
            tv_exchange: default_tv_exchange(),
            webhook_bots: Vec::new(),
        }
    }
}

/// One trading-automation bot the webhook signals are addressed to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookBot {
    pub uuid: String,
    /// Name of the environment variable holding this bot's secret.
    pub secret_env: String,
}

impl NotifyConfig {
    /// Amplitude alert text from `alert_template`, if one is configured.
    pub fn alert_text(&self, symbol: &str, ratio: f64) -> Option<String> {
        self.alert_template.as_ref().map(|template| {
            template
                .replace("{symbol}", symbol)
                .replace("{ratio}", &format!("{ratio:.2}"))
        })
    }
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_reference_interval() -> Interval {
    Interval::D1
}

fn default_reference_offset() -> usize {
    2
}

fn default_offsets() -> Vec<usize> {
    vec![1]
}

fn default_tv_exchange() -> String {
    "bybit".to_string()
}

impl Trigger {
    /// Bars of the signal series this trigger needs.
    pub fn required_bars(&self) -> usize {
        match self {
            // long span plus the prior, current and forming bars
            Trigger::EmaCrossover { long, .. } => long + 3,
            // value at offset 2 must be defined
            Trigger::SmaVsReference { period, .. } => period + 1,
            Trigger::Amplitude => 1,
        }
    }
}

impl WatchConfig {
    /// Load and validate a watch file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read watch config '{path}': {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: WatchConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse watch config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.trigger {
            Trigger::EmaCrossover { short, long } => {
                if *short == 0 || *long == 0 {
                    return Err(config_err("EMA periods must be >= 1"));
                }
                if short >= long {
                    return Err(config_err("EMA short period must be less than long period"));
                }
            }
            Trigger::SmaVsReference { period, reference_offset, .. } => {
                if *period == 0 {
                    return Err(config_err("SMA period must be >= 1"));
                }
                if *reference_offset == 0 {
                    return Err(config_err("reference_offset must be >= 1"));
                }
            }
            Trigger::Amplitude => {}
        }

        if self.candle_limit < self.trigger.required_bars() {
            return Err(config_err(&format!(
                "candle_limit {} is below the {} bars the trigger needs",
                self.candle_limit,
                self.trigger.required_bars()
            )));
        }

        if !self.gate.threshold.is_finite() || self.gate.threshold < 1.0 {
            return Err(config_err("gate threshold must be a finite ratio >= 1.0"));
        }
        if self.gate.offsets.is_empty() || self.gate.offsets.contains(&0) {
            return Err(config_err("gate offsets must be non-empty and >= 1"));
        }
        if self.gate.interval.is_none() && self.max_gate_offset() > self.candle_limit {
            return Err(config_err("gate offset exceeds candle_limit"));
        }
        if let Some((interval, bars)) = self
            .series_requirements()
            .into_iter()
            .find(|(_, bars)| *bars > MAX_FETCH_LIMIT)
        {
            return Err(config_err(&format!(
                "{bars} bars of {interval} exceed the {MAX_FETCH_LIMIT}-bar fetch limit"
            )));
        }

        if self.poll_interval_secs == 0 {
            return Err(config_err("poll_interval_secs must be >= 1"));
        }

        if self.allowed_symbols.is_empty() {
            return Err(config_err("allowed_symbols is empty"));
        }
        let allowed: Vec<String> = self.allowed_symbols.iter().map(|s| s.to_uppercase()).collect();
        if let Some(unknown) = self
            .initial_symbols
            .iter()
            .find(|s| !allowed.contains(&s.to_uppercase()))
        {
            return Err(config_err(&format!("initial symbol '{unknown}' is not allowed")));
        }

        let notify = &self.notify;
        if !notify.telegram && !notify.chart && notify.webhook_bots.is_empty() {
            return Err(config_err("no notification sink enabled"));
        }
        if !notify.webhook_bots.is_empty() && self.trigger == Trigger::Amplitude {
            return Err(config_err("webhook bots need an entry trigger, not 'amplitude'"));
        }
        if let Some(template) = &notify.alert_template {
            if self.trigger != Trigger::Amplitude {
                return Err(config_err("alert_template only applies to the 'amplitude' trigger"));
            }
            if template.trim().is_empty() {
                return Err(config_err("alert_template is empty"));
            }
        }
        for bot in &notify.webhook_bots {
            uuid::Uuid::parse_str(&bot.uuid)
                .map_err(|e| config_err(&format!("webhook bot uuid '{}': {e}", bot.uuid)))?;
        }

        Ok(())
    }

    fn max_gate_offset(&self) -> usize {
        self.gate.offsets.iter().copied().max().unwrap_or(1)
    }

    /// Every candle series one evaluation needs, with the bar count to fetch.
    /// The signal series comes first; series sharing an interval are merged.
    pub fn series_requirements(&self) -> Vec<(Interval, usize)> {
        let mut needs: Vec<(Interval, usize)> = vec![(self.interval, self.candle_limit)];
        let mut need = |interval: Interval, bars: usize| {
            match needs.iter_mut().find(|(i, _)| *i == interval) {
                Some((_, limit)) => *limit = (*limit).max(bars),
                None => needs.push((interval, bars)),
            }
        };

        need(self.gate.interval.unwrap_or(self.interval), self.max_gate_offset());
        if let Trigger::SmaVsReference {
            reference_interval,
            reference_offset,
            ..
        } = &self.trigger
        {
            need(*reference_interval, *reference_offset);
        }
        needs
    }
}

fn config_err(msg: &str) -> Error {
    Error::Config(msg.to_string())
}
