use std::time::Duration;

use crate::{Error, Result};

/// Process-level configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
///
/// Strategy and watch-list settings live in the TOML watch file
/// (`WATCH_CONFIG_PATH`), see `strategy::WatchConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub telegram_allowed_user_ids: Vec<i64>,
    pub telegram_alert_chat_ids: Vec<i64>,

    // Exchange
    pub bybit_base_url: String,
    pub bybit_category: String,

    // Webhook
    pub webhook_url: Option<String>,

    pub http_timeout: Duration,

    pub watch_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing or malformed required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_allowed_user_ids = parse_id_list(&required_env("TELEGRAM_ALLOWED_USER_IDS"))
            .unwrap_or_else(|e| panic!("TELEGRAM_ALLOWED_USER_IDS: {e}"));

        let telegram_alert_chat_ids = match optional_env("TELEGRAM_ALERT_CHAT_IDS") {
            Some(raw) => {
                parse_id_list(&raw).unwrap_or_else(|e| panic!("TELEGRAM_ALERT_CHAT_IDS: {e}"))
            }
            None => telegram_allowed_user_ids.clone(),
        };

        let http_timeout_secs = optional_env("HTTP_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .unwrap_or_else(|_| panic!("HTTP_TIMEOUT_SECS must be an integer, got '{v}'"))
            })
            .unwrap_or(10);

        Config {
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_allowed_user_ids,
            telegram_alert_chat_ids,
            bybit_base_url: optional_env("BYBIT_BASE_URL")
                .unwrap_or_else(|| "https://api.bybit.com".to_string()),
            bybit_category: optional_env("BYBIT_CATEGORY").unwrap_or_else(|| "linear".to_string()),
            webhook_url: optional_env("WEBHOOK_URL").filter(|v| !v.trim().is_empty()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            watch_config_path: optional_env("WATCH_CONFIG_PATH")
                .unwrap_or_else(|| "config/watch.toml".to_string()),
        }
    }

    /// Resolve a secret referenced by name from the watch file.
    pub fn secret(&self, key: &str) -> Result<String> {
        optional_env(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config(format!("secret environment variable '{key}' is not set")))
    }
}

/// Parse a comma-separated list of numeric Telegram ids.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("non-numeric id '{s}'")))
        })
        .collect()
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
