use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use common::{Alert, Sink};

/// What happened to one alert handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Same payload as the last delivered alert for this symbol; nothing sent.
    Duplicate,
    /// At least one sink confirmed; the payload is now the symbol's last alert.
    Delivered { ok: usize, failed: usize },
    /// Every sink failed; state untouched so the next cycle retries.
    Failed,
}

/// Fans alerts out to every sink, suppressing repeats per symbol.
///
/// The dedup map lives for the process lifetime and is only updated after a
/// confirmed delivery, so a signal that never reached anyone is retried.
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    last_alert: HashMap<String, String>,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            last_alert: HashMap::new(),
        }
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Payload most recently delivered for `symbol`.
    pub fn last_alert(&self, symbol: &str) -> Option<&str> {
        self.last_alert.get(symbol).map(String::as_str)
    }

    pub async fn notify(&mut self, alert: &Alert) -> Delivery {
        if self.last_alert(&alert.symbol) == Some(alert.payload.as_str()) {
            return Delivery::Duplicate;
        }

        let mut ok = 0;
        let mut failed = 0;
        for sink in &self.sinks {
            match sink.send(alert).await {
                Ok(()) => {
                    ok += 1;
                    info!(
                        symbol = %alert.symbol,
                        action = %alert.action,
                        sink = sink.name(),
                        "Alert delivered"
                    );
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        symbol = %alert.symbol,
                        sink = sink.name(),
                        error = %e,
                        "Alert delivery failed"
                    );
                }
            }
        }

        if ok == 0 {
            return Delivery::Failed;
        }

        self.last_alert.insert(alert.symbol.clone(), alert.payload.clone());
        Delivery::Delivered { ok, failed }
    }
}
