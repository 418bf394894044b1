use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use zone_scanner_core::candle::Candle;
use zone_scanner_core::timeframe::Timeframe;

use crate::error::ProviderError;
use crate::provider::SeriesProvider;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance market data provider.
/// No authentication required. Daily, weekly and monthly bars go back decades.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url(YAHOO_CHART_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0")
                .build()
                .expect("failed to build reqwest client"),
            base_url,
        }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    #[serde(default)]
    meta: Option<YahooMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    exchange_timezone_name: Option<String>,
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Converts bar timestamps to the exchange's calendar date.
enum ExchangeClock {
    Named(Tz),
    Offset(FixedOffset),
}

impl ExchangeClock {
    fn from_meta(meta: Option<&YahooMeta>) -> Self {
        let named = meta
            .and_then(|m| m.exchange_timezone_name.as_deref())
            .and_then(|name| name.parse::<Tz>().ok());
        if let Some(tz) = named {
            return ExchangeClock::Named(tz);
        }

        let offset = meta
            .and_then(|m| m.gmtoffset)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        ExchangeClock::Offset(offset)
    }

    fn date(&self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            ExchangeClock::Named(tz) => ts.with_timezone(tz).date_naive(),
            ExchangeClock::Offset(offset) => ts.with_timezone(offset).date_naive(),
        }
    }
}

fn parse_yahoo_result(result: &YahooResult) -> Result<Vec<Candle>, ProviderError> {
    let timestamps = result
        .timestamp
        .as_ref()
        .ok_or_else(|| ProviderError::Parse("missing timestamps".into()))?;

    if result.indicators.quote.is_empty() {
        return Ok(Vec::new());
    }

    let clock = ExchangeClock::from_meta(result.meta.as_ref());
    let quote = &result.indicators.quote[0];
    let mut candles = Vec::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let field = |values: &[Option<f64>]| values.get(i).copied().flatten();
        // skip bars with missing prices
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        let volume = field(&quote.volume).unwrap_or(0.0);

        let timestamp = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| ProviderError::Parse(format!("invalid unix timestamp: {ts}")))?;

        candles.push(Candle {
            date: clock.date(timestamp),
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(candles)
}

fn unix_start_of(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<NaiveDate>,
    ) -> Result<Vec<Candle>, ProviderError> {
        let now = Utc::now();
        let start = since.unwrap_or_else(|| timeframe.history_start(now.date_naive()));
        debug!("{symbol} [{timeframe}]: requesting bars from {start}");

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, symbol))
            .query(&[
                ("period1", unix_start_of(start).to_string()),
                ("period2", now.timestamp().to_string()),
                ("interval", timeframe.as_str().to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let body: YahooResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        candles_from_response(body, symbol, timeframe, since)
    }
}

fn candles_from_response(
    body: YahooResponse,
    symbol: &str,
    timeframe: Timeframe,
    since: Option<NaiveDate>,
) -> Result<Vec<Candle>, ProviderError> {
    if let Some(error) = body.chart.error {
        if error.code == "Not Found" {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        return Err(ProviderError::Api {
            status: 0,
            message: format!("{}: {}", error.code, error.description),
        });
    }

    let results = body
        .chart
        .result
        .ok_or_else(|| ProviderError::Parse("no results in response".into()))?;

    let Some(result) = results.first() else {
        return Ok(Vec::new());
    };

    let mut candles = parse_yahoo_result(result)?;
    if let Some(since) = since {
        candles.retain(|c| c.date >= since);
    }
    candles.sort_by_key(|c| c.date);
    Ok(candles)
}
