use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use common::{Candle, Error, Interval, MarketData, Result, MAX_FETCH_LIMIT};

pub const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

/// REST client for Bybit public market data (v5 kline endpoint).
pub struct BybitClient {
    base_url: Url,
    category: String,
    http: Client,
}

impl BybitClient {
    /// `timeout` bounds every request; expiry surfaces as `DataUnavailable`.
    pub fn new(base_url: &str, category: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid Bybit base URL '{base_url}': {e}")))?;
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url,
            category: category.into(),
            http,
        })
    }

    fn kline_url(&self, symbol: &str, interval: Interval, limit: usize) -> Result<Url> {
        let mut url = self
            .base_url
            .join("/v5/market/kline")
            .map_err(|e| Error::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("category", &self.category)
            .append_pair("symbol", &market_symbol(symbol))
            .append_pair("interval", interval_code(interval))
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl MarketData for BybitClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        if limit == 0 || limit > MAX_FETCH_LIMIT {
            return Err(Error::DataUnavailable(format!(
                "kline limit {limit} outside 1..={MAX_FETCH_LIMIT}"
            )));
        }

        let url = self.kline_url(symbol, interval, limit)?;
        debug!(symbol, %interval, limit, "Fetching klines");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{symbol} {interval}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{symbol} {interval}: {e}")))?;

        if !status.is_success() {
            return Err(Error::DataUnavailable(format!("HTTP {status}: {body}")));
        }

        parse_klines(&body, limit)
    }
}

/// Exchange symbol for a display pair: `BTC/USDT` → `BTCUSDT`.
/// A settlement suffix (`BTC/USDT:USDT`) is dropped.
pub fn market_symbol(symbol: &str) -> String {
    let base = symbol.split(':').next().unwrap_or(symbol);
    base.chars()
        .filter(|c| !matches!(c, '/' | '-' | '_'))
        .collect::<String>()
        .to_uppercase()
}

fn interval_code(interval: Interval) -> &'static str {
    match interval {
        Interval::M1 => "1",
        Interval::M5 => "5",
        Interval::M15 => "15",
        Interval::M30 => "30",
        Interval::H1 => "60",
        Interval::H4 => "240",
        Interval::D1 => "D",
    }
}

/// Parse a kline response body into candles, ascending by open time.
///
/// Bybit lists bars newest first as string tuples
/// `[startTime, open, high, low, close, volume, turnover]`.
pub fn parse_klines(body: &str, limit: usize) -> Result<Vec<Candle>> {
    let resp: KlineResponse = serde_json::from_str(body)
        .map_err(|e| Error::DataUnavailable(format!("unreadable kline response: {e}")))?;

    if resp.ret_code != 0 {
        return Err(Error::DataUnavailable(format!(
            "Bybit retCode {}: {}",
            resp.ret_code, resp.ret_msg
        )));
    }

    let rows = resp.result.map(|r| r.list).unwrap_or_default();
    if rows.len() < limit {
        return Err(Error::DataUnavailable(format!(
            "requested {limit} bars, got {}",
            rows.len()
        )));
    }

    let mut candles = rows
        .iter()
        .take(limit)
        .map(Vec::as_slice)
        .map(parse_row)
        .collect::<Result<Vec<_>>>()?;
    candles.sort_by_key(|c| c.open_time);
    Ok(candles)
}

fn parse_row(row: &[String]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(Error::MalformedData(format!("kline row has {} fields", row.len())));
    }
    let num = |i: usize| -> Result<f64> {
        row[i]
            .parse::<f64>()
            .map_err(|_| Error::MalformedData(format!("non-numeric kline field '{}'", row[i])))
    };
    let start_ms = row[0]
        .parse::<i64>()
        .map_err(|_| Error::MalformedData(format!("bad kline start time '{}'", row[0])))?;
    let open_time = Utc
        .timestamp_millis_opt(start_ms)
        .single()
        .ok_or_else(|| Error::MalformedData(format!("kline start time {start_ms} out of range")))?;

    Ok(Candle {
        open_time,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KlineResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<KlineResult>,
}

#[derive(Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "retCode": 0,
        "retMsg": "OK",
        "result": {
            "category": "linear",
            "symbol": "BTCUSDT",
            "list": [
                ["1700000120000", "102", "104", "101", "103", "7", "721"],
                ["1700000060000", "101", "103", "100", "102", "6", "612"],
                ["1700000000000", "100", "102", "99", "101", "5", "505"]
            ]
        },
        "time": 1700000130000
    }"#;

    #[test]
    fn klines_are_returned_oldest_first() {
        let candles = parse_klines(BODY, 3).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].close, 101.0);
        assert_eq!(candles[2].close, 103.0);
        assert!(candles[0].open_time < candles[1].open_time);
        assert_eq!(candles[1].high, 103.0);
        assert_eq!(candles[1].low, 100.0);
        assert_eq!(candles[1].volume, 6.0);
    }

    #[test]
    fn fewer_bars_than_requested_is_unavailable() {
        assert!(matches!(parse_klines(BODY, 4), Err(Error::DataUnavailable(_))));
    }

    #[test]
    fn surplus_rows_keep_the_newest() {
        let candles = parse_klines(BODY, 2).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 102.0);
        assert_eq!(candles[1].close, 103.0);
    }

    #[test]
    fn error_ret_code_is_unavailable() {
        let body = r#"{"retCode": 10001, "retMsg": "params error", "result": {}}"#;
        let err = parse_klines(body, 1).unwrap_err();
        assert!(err.to_string().contains("params error"));
    }

    #[test]
    fn garbage_field_is_malformed() {
        let body = r#"{"retCode": 0, "retMsg": "OK", "result": {"list": [["1700000000000", "x", "1", "1", "1", "1", "1"]]}}"#;
        assert!(matches!(parse_klines(body, 1), Err(Error::MalformedData(_))));
    }

    #[test]
    fn display_pair_maps_to_exchange_symbol() {
        assert_eq!(market_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(market_symbol("eth/usdt:USDT"), "ETHUSDT");
    }

    #[test]
    fn kline_url_carries_query() {
        let client = BybitClient::new(DEFAULT_BASE_URL, "linear", Duration::from_secs(5)).unwrap();
        let url = client.kline_url("BTC/USDT", Interval::H4, 50).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.bybit.com/v5/market/kline?category=linear&symbol=BTCUSDT&interval=240&limit=50"
        );
    }
}
