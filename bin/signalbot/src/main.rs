use std::sync::Arc;

use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, Sink, SymbolRegistry};
use engine::{BybitClient, Poller};
use notify::{CandleChart, Dispatcher, WebhookSink};
use strategy::WatchConfig;
use telegram_ctrl::{start_bot, verify_token, BotDeps, TelegramChartSink, TelegramSink};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let watch = WatchConfig::load(&cfg.watch_config_path)
        .unwrap_or_else(|e| panic!("Failed to load watch config: {e}"));
    info!(
        path = %cfg.watch_config_path,
        interval = %watch.interval,
        trigger = ?watch.trigger,
        "SignalBot starting"
    );

    // ── Telegram ──────────────────────────────────────────────────────────────
    let bot = Bot::new(cfg.telegram_token.clone());
    let username = verify_token(&bot).await.unwrap_or_else(|e| panic!("{e}"));
    info!(bot = %username, "Telegram token verified");

    // ── Symbol registry ───────────────────────────────────────────────────────
    let registry = SymbolRegistry::new(&watch.allowed_symbols);
    if !watch.initial_symbols.is_empty() {
        registry.add(&watch.initial_symbols).await;
    }

    // ── Market data ───────────────────────────────────────────────────────────
    let market =
        BybitClient::new(&cfg.bybit_base_url, cfg.bybit_category.clone(), cfg.http_timeout)
            .unwrap_or_else(|e| panic!("Failed to build Bybit client: {e}"));

    // ── Sinks ─────────────────────────────────────────────────────────────────
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    if watch.notify.chart {
        sinks.push(Arc::new(TelegramChartSink::new(
            bot.clone(),
            &cfg.telegram_alert_chat_ids,
            Arc::new(CandleChart::default()),
        )));
    } else if watch.notify.telegram {
        sinks.push(Arc::new(TelegramSink::new(bot.clone(), &cfg.telegram_alert_chat_ids)));
    }
    if !watch.notify.webhook_bots.is_empty() {
        let url = cfg
            .webhook_url
            .clone()
            .unwrap_or_else(|| panic!("WEBHOOK_URL must be set when webhook bots are configured"));
        for bot_cfg in &watch.notify.webhook_bots {
            let secret = cfg
                .secret(&bot_cfg.secret_env)
                .unwrap_or_else(|e| panic!("{e}"));
            let sink = WebhookSink::new(
                url.clone(),
                bot_cfg.uuid.clone(),
                secret,
                watch.notify.tv_exchange.clone(),
                cfg.http_timeout,
            )
            .unwrap_or_else(|e| panic!("Failed to build webhook sink: {e}"));
            sinks.push(Arc::new(sink));
        }
    }

    // ── Poller ────────────────────────────────────────────────────────────────
    let bot_deps = BotDeps {
        registry: registry.clone(),
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
    };
    let poller = Poller::new(Arc::new(market), watch, registry, Dispatcher::new(sinks));

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    tokio::spawn(poller.run());
    tokio::spawn(start_bot(bot, bot_deps));

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}
