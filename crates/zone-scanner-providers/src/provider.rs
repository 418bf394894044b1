use async_trait::async_trait;
use chrono::NaiveDate;
use zone_scanner_core::candle::Candle;
use zone_scanner_core::timeframe::Timeframe;

use crate::error::ProviderError;

/// Source of daily, weekly or monthly OHLCV candles.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch candles for a symbol, oldest first.
    ///
    /// With `since` set, only candles dated on or after it are requested so the
    /// caller can merge them into a cached series. Without it the timeframe's
    /// default history window is fetched. An empty vec means no new candles;
    /// [`ProviderError::NoData`] means the symbol has no data at all.
    async fn fetch_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<NaiveDate>,
    ) -> Result<Vec<Candle>, ProviderError>;
}
