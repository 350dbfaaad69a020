use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use common::{Action, Alert, Error, Result, Sink};

/// Signals older than this many seconds are ignored by the receiving bot.
const MAX_LAG_SECS: &str = "300";

/// JSON body understood by the trading-automation webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub secret: String,
    pub max_lag: String,
    pub timestamp: String,
    pub trigger_price: String,
    pub tv_exchange: String,
    pub tv_instrument: String,
    pub action: String,
    pub bot_uuid: String,
}

/// Close price as sent to the bot; whole numbers keep one decimal (`65000.0`).
fn price_text(price: f64) -> String {
    if price.is_finite() && price.fract() == 0.0 {
        format!("{price:.1}")
    } else {
        price.to_string()
    }
}

/// Perpetual-contract instrument code: `BTC/USDT` → `BTCUSDT.P`.
pub fn tv_instrument(symbol: &str) -> String {
    let stripped: String = symbol
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ':'))
        .collect();
    format!("{stripped}.P")
}

/// Posts entry signals to one automation bot.
pub struct WebhookSink {
    name: String,
    http: Client,
    url: String,
    bot_uuid: String,
    secret: String,
    tv_exchange: String,
}

impl WebhookSink {
    pub fn new(
        url: impl Into<String>,
        bot_uuid: impl Into<String>,
        secret: impl Into<String>,
        tv_exchange: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let bot_uuid = bot_uuid.into();
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            name: format!("webhook:{bot_uuid}"),
            http,
            url: url.into(),
            bot_uuid,
            secret: secret.into(),
            tv_exchange: tv_exchange.into(),
        })
    }

    pub fn payload(&self, alert: &Alert, now: DateTime<Utc>) -> Result<WebhookPayload> {
        match alert.action {
            Action::EnterLong | Action::EnterShort => {}
            other => {
                return Err(Error::SinkDelivery {
                    sink: self.name.clone(),
                    reason: format!("action '{other}' is not a webhook signal"),
                })
            }
        }
        Ok(WebhookPayload {
            secret: self.secret.clone(),
            max_lag: MAX_LAG_SECS.to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, false),
            trigger_price: price_text(alert.trigger_price),
            tv_exchange: self.tv_exchange.clone(),
            tv_instrument: tv_instrument(&alert.symbol),
            action: alert.action.as_str().to_string(),
            bot_uuid: self.bot_uuid.clone(),
        })
    }
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let payload = self.payload(alert, Utc::now())?;
        debug!(
            symbol = %alert.symbol,
            bot = %self.bot_uuid,
            action = %payload.action,
            "Posting webhook"
        );

        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.delivery_error(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(self.delivery_error(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }
}

impl WebhookSink {
    fn delivery_error(&self, reason: String) -> Error {
        Error::SinkDelivery {
            sink: self.name.clone(),
            reason,
        }
    }
}
