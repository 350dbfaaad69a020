use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{prelude::*, types::InputFile};
use tracing::warn;

use common::{Alert, ChartRenderer, Error, Result, Sink};

/// Sends alert text to every configured chat. Succeeds if any chat got it.
pub struct TelegramSink {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_ids: &[i64]) -> Self {
        Self {
            bot,
            chat_ids: chat_ids.iter().map(|&id| ChatId(id)).collect(),
        }
    }
}

#[async_trait]
impl Sink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let mut delivered = 0;
        for &chat_id in &self.chat_ids {
            match self.bot.send_message(chat_id, &alert.text).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert"),
            }
        }
        confirm(self.name(), delivered)
    }
}

/// Sends alert text followed by a rendered candlestick chart.
pub struct TelegramChartSink {
    bot: Bot,
    chat_ids: Vec<ChatId>,
    renderer: Arc<dyn ChartRenderer>,
}

impl TelegramChartSink {
    pub fn new(bot: Bot, chat_ids: &[i64], renderer: Arc<dyn ChartRenderer>) -> Self {
        Self {
            bot,
            chat_ids: chat_ids.iter().map(|&id| ChatId(id)).collect(),
            renderer,
        }
    }
}

#[async_trait]
impl Sink for TelegramChartSink {
    fn name(&self) -> &str {
        "telegram-chart"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        let caption = chart_caption(&alert.symbol);
        let image = self.renderer.render(&alert.symbol, &alert.candles)?;

        let mut delivered = 0;
        for &chat_id in &self.chat_ids {
            if let Err(e) = self.bot.send_message(chat_id, &alert.text).await {
                warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert");
                continue;
            }
            let photo = InputFile::memory(image.clone()).file_name("chart.png");
            match self.bot.send_photo(chat_id, photo).caption(caption.clone()).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(chat_id = ?chat_id, error = %e, "Failed to send chart image"),
            }
        }
        confirm(self.name(), delivered)
    }
}

fn chart_caption(symbol: &str) -> String {
    format!("{symbol} - Amplitude Alert for {symbol}")
}

fn confirm(sink: &str, delivered: usize) -> Result<()> {
    if delivered == 0 {
        return Err(Error::SinkDelivery {
            sink: sink.to_string(),
            reason: "no chat accepted the message".to_string(),
        });
    }
    Ok(())
}
