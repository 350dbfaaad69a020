use async_trait::async_trait;

use crate::{Alert, Candle, Result};

/// A delivery target for alerts (chat message, chat message + chart, webhook).
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs and `Error::SinkDelivery`.
    fn name(&self) -> &str;

    /// Deliver one alert. `Ok(())` means the remote end confirmed receipt.
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Produces a PNG candlestick chart for the chart sink.
pub trait ChartRenderer: Send + Sync {
    /// Fails with `Error::Chart` when there is nothing drawable.
    fn render(&self, symbol: &str, candles: &[Candle]) -> Result<Vec<u8>>;
}
