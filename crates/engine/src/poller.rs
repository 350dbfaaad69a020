use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use common::{Action, Alert, Error, MarketData, Result, SymbolRegistry};
use notify::{Delivery, Dispatcher};
use strategy::{evaluate, MarketSnapshot, WatchConfig};

/// Tally of one pass over the tracked symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub evaluated: usize,
    pub skipped: usize,
    pub signals: usize,
    pub delivered: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// The fetch → evaluate → notify loop.
///
/// Symbols are processed one after another; an error for one symbol is
/// logged and the cycle moves on to the next.
pub struct Poller {
    market: Arc<dyn MarketData>,
    watch: WatchConfig,
    registry: SymbolRegistry,
    dispatcher: Dispatcher,
}

impl Poller {
    pub fn new(
        market: Arc<dyn MarketData>,
        watch: WatchConfig,
        registry: SymbolRegistry,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            market,
            watch,
            registry,
            dispatcher,
        }
    }

    /// Run forever. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        let period = Duration::from_secs(self.watch.poll_interval_secs);
        info!(
            interval = %self.watch.interval,
            poll_secs = self.watch.poll_interval_secs,
            sinks = ?self.dispatcher.sink_names(),
            "Poller running"
        );

        loop {
            let report = self.run_cycle().await;
            debug!(?report, "Cycle finished");
            tokio::time::sleep(period).await;
        }
    }

    /// One pass over a snapshot of the registry.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for symbol in self.registry.snapshot().await {
            match self.process_symbol(&symbol).await {
                Ok(None) => report.evaluated += 1,
                Ok(Some(delivery)) => {
                    report.evaluated += 1;
                    report.signals += 1;
                    match delivery {
                        Delivery::Delivered { .. } => report.delivered += 1,
                        Delivery::Duplicate => report.duplicates += 1,
                        Delivery::Failed => report.failed += 1,
                    }
                }
                Err(e @ Error::MalformedData(_)) => {
                    report.skipped += 1;
                    warn!(symbol = %symbol, error = %e, "Skipping symbol: malformed data");
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(symbol = %symbol, error = %e, "Skipping symbol this cycle");
                }
            }
        }
        report
    }

    /// Fetch, evaluate and, on a signal, dispatch. `Ok(None)` means no signal.
    async fn process_symbol(&mut self, symbol: &str) -> Result<Option<Delivery>> {
        let snapshot = self.fetch_snapshot(symbol).await?;
        let signal = evaluate(symbol, &snapshot, &self.watch.trigger, &self.watch.gate)?;

        if let Some(amplitude) = signal.amplitude {
            debug!(symbol, amplitude, action = %signal.action, "Evaluated");
        }
        if signal.action == Action::None {
            return Ok(None);
        }

        let mut alert = Alert::from_signal(&signal, snapshot.candles);
        if signal.action == Action::AmplitudeAlert {
            let ratio = signal.amplitude.unwrap_or(1.0);
            if let Some(text) = self.watch.notify.alert_text(symbol, ratio) {
                alert = alert.with_text(text);
            }
        }
        Ok(Some(self.dispatcher.notify(&alert).await))
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<MarketSnapshot> {
        let mut needs = self.watch.series_requirements().into_iter();
        let (interval, limit) = needs
            .next()
            .ok_or_else(|| Error::Config("no candle series configured".into()))?;

        let candles = self.market.fetch_candles(symbol, interval, limit).await?;
        let mut snapshot = MarketSnapshot::new(interval, candles);
        for (interval, limit) in needs {
            let candles = self.market.fetch_candles(symbol, interval, limit).await?;
            snapshot = snapshot.with_series(interval, candles);
        }
        Ok(snapshot)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use common::{Candle, Interval, Sink};

    /// Serves canned series; symbols without data fail with `DataUnavailable`.
    struct FakeMarket {
        series: HashMap<(String, Interval), Vec<Candle>>,
    }

    #[async_trait]
    impl MarketData for FakeMarket {
        async fn fetch_candles(
            &self,
            symbol: &str,
            interval: Interval,
            limit: usize,
        ) -> Result<Vec<Candle>> {
            let candles = self
                .series
                .get(&(symbol.to_string(), interval))
                .ok_or_else(|| Error::DataUnavailable(format!("no data for {symbol}")))?;
            if candles.len() < limit {
                return Err(Error::DataUnavailable("short".into()));
            }
            Ok(candles[candles.len() - limit..].to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Sink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, alert: &Alert) -> Result<()> {
            self.sent.lock().unwrap().push(format!("{} {}", alert.symbol, alert.payload));
            Ok(())
        }
    }

    fn bar(i: usize, close: f64, high: f64, low: f64) -> Candle {
        Candle {
            open_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap()
                + ChronoDuration::minutes(i as i64),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn crossing_up() -> Vec<Candle> {
        let mut closes = vec![10.0; 7];
        closes.extend([9.0, 11.0, 11.0]);
        closes.into_iter().enumerate().map(|(i, c)| bar(i, c, c, c)).collect()
    }

    fn watch() -> WatchConfig {
        WatchConfig::from_toml_str(
            r#"
            interval = "1m"
            candle_limit = 10
            poll_interval_secs = 1
            allowed_symbols = ["BTC/USDT", "ETH/USDT", "SOL/USDT"]

            [trigger]
            type = "ema_crossover"
            short = 1
            long = 3

            [gate]
            interval = "1d"
            offsets = [2, 1]
            threshold = 1.20

            [notify]
            telegram = true
            "#,
        )
        .unwrap()
    }

    fn market() -> FakeMarket {
        let mut series = HashMap::new();
        series.insert(("BTC/USDT".to_string(), Interval::M1), crossing_up());
        series.insert(
            ("BTC/USDT".to_string(), Interval::D1),
            vec![bar(0, 100.0, 130.0, 100.0), bar(1, 100.0, 101.0, 100.0)],
        );
        // ETH crosses too, but its daily range is too narrow for the gate
        series.insert(("ETH/USDT".to_string(), Interval::M1), crossing_up());
        series.insert(
            ("ETH/USDT".to_string(), Interval::D1),
            vec![bar(0, 100.0, 101.0, 100.0), bar(1, 100.0, 101.0, 100.0)],
        );
        FakeMarket { series }
    }

    async fn poller(sink: Arc<RecordingSink>) -> Poller {
        let registry = SymbolRegistry::new(["BTC/USDT", "ETH/USDT", "SOL/USDT"]);
        registry.add(["SOL/USDT", "BTC/USDT", "ETH/USDT"]).await;
        let dispatcher = Dispatcher::new(vec![sink as Arc<dyn Sink>]);
        Poller::new(Arc::new(market()), watch(), registry, dispatcher)
    }

    #[tokio::test]
    async fn failing_symbol_does_not_abort_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let mut poller = poller(sink.clone()).await;

        let report = poller.run_cycle().await;

        // SOL has no data and is skipped; BTC alerts; ETH is gated out
        assert_eq!(report.skipped, 1);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.signals, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(*sink.sent.lock().unwrap(), vec!["BTC/USDT enter_long".to_string()]);
    }

    #[tokio::test]
    async fn unchanged_signal_is_not_resent_next_cycle() {
        let sink = Arc::new(RecordingSink::default());
        let mut poller = poller(sink.clone()).await;

        poller.run_cycle().await;
        let second = poller.run_cycle().await;

        assert_eq!(second.duplicates, 1);
        assert_eq!(second.delivered, 0);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
        assert_eq!(poller.dispatcher().last_alert("BTC/USDT"), Some("enter_long"));
    }

    #[tokio::test]
    async fn amplitude_alert_uses_configured_text() {
        let watch = WatchConfig::from_toml_str(
            r#"
            interval = "4h"
            candle_limit = 2
            allowed_symbols = ["BTC/USDT"]
            [trigger]
            type = "amplitude"
            [gate]
            threshold = 1.10
            strict = true
            [notify]
            telegram = true
            alert_template = "Amplitude ratio > 1.1 detected on #{symbol}"
            "#,
        )
        .unwrap();
        let mut series = HashMap::new();
        series.insert(
            ("BTC/USDT".to_string(), Interval::H4),
            vec![bar(0, 100.0, 101.0, 100.0), bar(1, 100.0, 112.0, 100.0)],
        );
        let registry = SymbolRegistry::new(["BTC/USDT"]);
        registry.add(["BTC/USDT"]).await;
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Dispatcher::new(vec![sink.clone() as Arc<dyn Sink>]);
        let mut poller = Poller::new(Arc::new(FakeMarket { series }), watch, registry, dispatcher);

        let report = poller.run_cycle().await;

        assert_eq!(report.delivered, 1);
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec!["BTC/USDT Amplitude ratio > 1.1 detected on #BTC/USDT".to_string()]
        );
    }

    #[tokio::test]
    async fn cleared_registry_polls_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let registry = SymbolRegistry::new(["BTC/USDT"]);
        registry.add(["BTC/USDT"]).await;
        let dispatcher = Dispatcher::new(vec![sink.clone() as Arc<dyn Sink>]);
        let mut poller = Poller::new(Arc::new(market()), watch(), registry.clone(), dispatcher);

        registry.clear().await;
        let report = poller.run_cycle().await;

        assert_eq!(report, CycleReport::default());
        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
