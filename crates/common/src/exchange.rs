use async_trait::async_trait;

use crate::{Candle, Interval, Result};

/// Most bars one `fetch_candles` call may ask for (Bybit's kline page size).
pub const MAX_FETCH_LIMIT: usize = 1000;

/// Read-only candle source.
///
/// `BybitClient` implements this against the public kline endpoint; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch the newest `limit` bars for `symbol`, ascending by open time.
    ///
    /// Fails with `Error::DataUnavailable` when the upstream errors, times
    /// out, or returns fewer than `limit` bars.
    async fn fetch_candles(&self, symbol: &str, interval: Interval, limit: usize)
        -> Result<Vec<Candle>>;
}
