use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use zone_scanner_core::store::SeriesStore;
use zone_scanner_core::zone::{self, CandidateZone, DetectionConfig};
use zone_scanner_core::{ScannerError, Series, Timeframe};
use zone_scanner_providers::{ProviderError, SeriesProvider};

/// What to scan and how.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub detection: DetectionConfig,
    /// Start from the cached series and fetch only newer candles.
    pub use_cache: bool,
    /// Maximum number of (symbol, timeframe) tasks running at once.
    pub concurrency: usize,
    /// Deadline for one task once it has a worker slot.
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] ScannerError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("task failed: {0}")]
    Join(String),
}

/// Detection output for one (symbol, timeframe) pair.
#[derive(Debug)]
pub struct SeriesScan {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub series: Series,
    pub zones: Vec<CandidateZone>,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub error: ScanError,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub results: Vec<SeriesScan>,
    pub failures: Vec<TaskFailure>,
}

impl ScanReport {
    /// Every zone found, best first.
    pub fn ranked_zones(&self) -> Vec<CandidateZone> {
        let mut zones: Vec<CandidateZone> = self
            .results
            .iter()
            .flat_map(|r| r.zones.iter().cloned())
            .collect();
        zone::rank_zones(&mut zones);
        zones
    }

    pub fn zone_count(&self) -> usize {
        self.results.iter().map(|r| r.zones.len()).sum()
    }
}

/// Run detection over every (symbol, timeframe) pair in parallel.
///
/// A failing or timed-out pair is recorded in [`ScanReport::failures`] and
/// never stops the rest of the batch.
pub async fn run_scan(
    provider: Arc<dyn SeriesProvider>,
    store: Arc<SeriesStore>,
    request: &ScanRequest,
) -> ScanReport {
    let workers = Arc::new(Semaphore::new(request.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pairs = HashMap::new();

    for &timeframe in &request.timeframes {
        for symbol in &request.symbols {
            let provider = Arc::clone(&provider);
            let store = Arc::clone(&store);
            let workers = Arc::clone(&workers);
            let task_symbol = symbol.clone();
            let detection = request.detection;
            let use_cache = request.use_cache;
            let timeout = request.timeout;

            let handle = tasks.spawn(async move {
                match workers.acquire_owned().await {
                    Ok(_permit) => tokio::time::timeout(
                        timeout,
                        scan_one(provider, store, task_symbol, timeframe, detection, use_cache),
                    )
                    .await
                    .unwrap_or(Err(ScanError::Timeout(timeout))),
                    Err(e) => Err(ScanError::Join(e.to_string())),
                }
            });
            pairs.insert(handle.id(), (symbol.clone(), timeframe));
        }
    }

    let mut report = ScanReport::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (e.id(), Err(ScanError::Join(e.to_string()))),
        };
        let Some((symbol, timeframe)) = pairs.remove(&id) else {
            continue;
        };

        match outcome {
            Ok(scan) => {
                if scan.zones.is_empty() {
                    debug!("{symbol} [{timeframe}]: no zones");
                } else {
                    info!("{symbol} [{timeframe}]: {} zone(s)", scan.zones.len());
                }
                report.results.push(scan);
            }
            Err(error) => {
                warn!("{symbol} [{timeframe}]: skipped: {error}");
                report.failures.push(TaskFailure {
                    symbol,
                    timeframe,
                    error,
                });
            }
        }
    }

    report
        .results
        .sort_by(|a, b| (&a.symbol, a.timeframe).cmp(&(&b.symbol, b.timeframe)));
    report
}

async fn scan_one(
    provider: Arc<dyn SeriesProvider>,
    store: Arc<SeriesStore>,
    symbol: String,
    timeframe: Timeframe,
    detection: DetectionConfig,
    use_cache: bool,
) -> Result<SeriesScan, ScanError> {
    let series = load_series(provider.as_ref(), &store, &symbol, timeframe, use_cache).await?;

    let scan = tokio::task::spawn_blocking(move || {
        let zones = zone::detect_zones(&series, timeframe, &symbol, &detection);
        SeriesScan {
            symbol,
            timeframe,
            series,
            zones,
        }
    })
    .await
    .map_err(|e| ScanError::Join(e.to_string()))?;

    Ok(scan)
}

/// Cached series topped up with newly fetched candles and written back.
/// A failed fetch falls back to the cached series when there is one.
async fn load_series(
    provider: &dyn SeriesProvider,
    store: &SeriesStore,
    symbol: &str,
    timeframe: Timeframe,
    use_cache: bool,
) -> Result<Series, ScanError> {
    let cached = if use_cache {
        store.read_or_empty(symbol, timeframe)?
    } else {
        Series::default()
    };
    let since = cached.last_date();

    match since {
        Some(date) => info!("Fetching {symbol} [{timeframe}] from {date}"),
        None => info!("Fetching {symbol} [{timeframe}] from start"),
    }

    let fresh = match provider.fetch_series(symbol, timeframe, since).await {
        Ok(candles) => candles,
        Err(e) if !cached.is_empty() => {
            warn!("{symbol} [{timeframe}]: fetch failed, using cached series: {e}");
            return Ok(cached);
        }
        Err(e) => return Err(e.into()),
    };

    let (series, rejected) = store.merge_and_write(symbol, timeframe, &cached, fresh)?;
    for row in &rejected {
        warn!("{symbol} [{timeframe}]: dropped row: {row}");
    }
    if let Some(last) = series.last_date() {
        debug!(
            "{symbol} [{timeframe}]: cached {} candle(s), last {last}",
            series.len()
        );
    }

    Ok(series)
}
