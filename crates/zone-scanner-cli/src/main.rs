mod charts;
mod scan;
mod symbols;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Rotation, RollingFileAppender};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use zone_scanner_core::export::write_zones_csv;
use zone_scanner_core::sizing::SizingConfig;
use zone_scanner_core::store::SeriesStore;
use zone_scanner_core::zone::DetectionConfig;
use zone_scanner_core::{CandidateZone, Timeframe};
use zone_scanner_providers::{SeriesProvider, YahooProvider};

use crate::scan::{ScanRequest, run_scan};

/// Log files kept in `--log-dir`, one per day.
const LOG_RETENTION_DAYS: usize = 7;

#[derive(Parser)]
#[command(name = "demandzone", about = "Multi-timeframe demand zone screener")]
struct Cli {
    /// Root directory of the Parquet series cache
    #[arg(long, default_value = "parquet_data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write daily-rotated log files to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan symbols for demand zones
    Scan(ScanArgs),

    /// Show what series are cached
    Status {
        /// Timeframes to list (all if omitted, comma-separated)
        #[arg(long, value_delimiter = ',')]
        tf: Option<Vec<Timeframe>>,
    },

    /// Delete cached series
    Clear {
        /// Symbol to delete (all symbols of the timeframe if omitted)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Timeframes to clear (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        tf: Vec<Timeframe>,
    },
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Timeframes to scan (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1mo,1wk,1d")]
    tf: Vec<Timeframe>,

    /// Symbols to scan (comma-separated); overrides the symbol list file
    #[arg(short, long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Stock list CSV with a YahooSymbol column
    #[arg(long, default_value = "StockList.csv")]
    symbols_file: PathBuf,

    /// Only scan symbols in these sectors (comma-separated)
    #[arg(long, value_delimiter = ',')]
    sector: Option<Vec<String>>,

    /// Maximum number of symbols to scan
    #[arg(long)]
    limit: Option<usize>,

    /// Only report zones price has not revisited
    #[arg(long)]
    fresh: bool,

    /// Accepted distance from current price to the zone, in percent
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values_t = [1.0, 5.0])]
    distance_range: Vec<f64>,

    /// Minimum base candle count
    #[arg(long, default_value_t = 1)]
    min_base: usize,

    /// Maximum base candle count
    #[arg(long, default_value_t = 3)]
    max_base: usize,

    /// Capital used for position sizing
    #[arg(long, default_value_t = 100_000.0)]
    capital: f64,

    /// Fraction of capital risked per zone
    #[arg(long, default_value_t = 0.01)]
    risk_pct: f64,

    /// Ignore the cache and download full history
    #[arg(long)]
    no_cache: bool,

    /// Ranked zone CSV output
    #[arg(short, long, default_value = "demand_zones.csv")]
    output: PathBuf,

    /// Write the candle window around each zone to this directory
    #[arg(long)]
    chart_dir: Option<PathBuf>,

    /// Symbols fetched and scanned at once
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Per symbol/timeframe deadline in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

impl ScanArgs {
    fn detection_config(&self) -> Result<DetectionConfig> {
        let [min_dist, max_dist] = self.distance_range[..] else {
            anyhow::bail!("--distance-range expects exactly two values");
        };
        anyhow::ensure!(
            min_dist <= max_dist,
            "--distance-range minimum {min_dist} exceeds maximum {max_dist}"
        );
        anyhow::ensure!(
            self.min_base >= 1 && self.min_base <= self.max_base,
            "--min-base must be at least 1 and not above --max-base"
        );

        Ok(DetectionConfig {
            fresh_only: self.fresh,
            min_base: self.min_base,
            max_base: self.max_base,
            distance_range: (min_dist, max_dist),
            sizing: SizingConfig {
                capital: self.capital,
                risk_pct: self.risk_pct,
                ..SizingConfig::default()
            },
            ..DetectionConfig::default()
        })
    }

    fn symbols(&self) -> Result<Vec<String>> {
        let mut symbols = match &self.symbols {
            Some(list) => list
                .iter()
                .map(String::as_str)
                .map(symbols::normalize_symbol)
                .collect(),
            None => symbols::load_symbols(&self.symbols_file, self.sector.as_deref())?,
        };
        if let Some(limit) = self.limit {
            symbols.truncate(limit);
        }
        Ok(symbols)
    }
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    let Some(dir) = log_dir else {
        registry.init();
        return Ok(None);
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("scanner")
        .filename_suffix("log")
        .max_log_files(LOG_RETENTION_DAYS)
        .build(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    info!("Logging to {}", dir.display());
    Ok(Some(guard))
}

async fn cmd_scan(store: SeriesStore, args: &ScanArgs) -> Result<()> {
    let detection = args.detection_config()?;
    let symbols = args.symbols()?;
    if symbols.is_empty() {
        warn!("No symbols to scan.");
        return Ok(());
    }

    let provider: Arc<dyn SeriesProvider> = Arc::new(YahooProvider::new());
    info!(
        "Starting demand-zone scan: {} symbol(s) x {} timeframe(s) via {}",
        symbols.len(),
        args.tf.len(),
        provider.name()
    );

    let request = ScanRequest {
        symbols,
        timeframes: args.tf.clone(),
        detection,
        use_cache: !args.no_cache,
        concurrency: args.concurrency,
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let report = run_scan(provider, Arc::new(store), &request).await;
    let zones = report.ranked_zones();

    log_summary(&zones);
    if !report.failures.is_empty() {
        warn!("{} symbol/timeframe pair(s) skipped", report.failures.len());
    }

    write_zones_csv(&args.output, &zones)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    if zones.is_empty() {
        info!("No valid demand zones detected.");
        return Ok(());
    }
    info!("Saved {} zone(s) to {}", zones.len(), args.output.display());

    if let Some(dir) = &args.chart_dir {
        let written = charts::export_chart_windows(dir, &report.results)?;
        info!("Saved {} chart window(s) to {}", written.len(), dir.display());
    }

    Ok(())
}

fn log_summary(zones: &[CandidateZone]) {
    info!("================ SUMMARY ================");
    for z in zones {
        info!(
            "{} | {} | Score: {} | Zone: {} - {} | Start: {} | RR: {}",
            z.symbol,
            z.timeframe,
            z.score,
            z.proximal,
            z.distal,
            z.start,
            z.rr_ratio.map_or_else(|| "-".to_string(), |rr| rr.to_string()),
        );
    }
    info!("Total zones detected: {}", zones.len());
    info!("=========================================");
}

fn cmd_status(store: &SeriesStore, timeframes: &[Timeframe]) -> Result<()> {
    let mut any = false;

    for &tf in timeframes {
        let symbols = store
            .list_symbols(tf)
            .with_context(|| format!("failed to list symbols for {tf}"))?;

        for sym in &symbols {
            any = true;
            match store.read(sym, tf) {
                Ok(series) => match (series.first_date(), series.last_date()) {
                    (Some(first), Some(last)) => println!(
                        "{sym} [{tf}]: {} candle(s), {first} to {last}",
                        series.len()
                    ),
                    _ => println!("{sym} [{tf}]: empty"),
                },
                Err(e) => println!("ERROR: {sym} [{tf}]: failed to read: {e}"),
            }
        }
    }

    if !any {
        println!("No data in cache.");
    }
    Ok(())
}

fn cmd_clear(store: &SeriesStore, symbol: Option<&str>, timeframes: &[Timeframe]) -> Result<()> {
    for &tf in timeframes {
        let removed = store
            .clear(symbol, tf)
            .with_context(|| format!("failed to clear cache for {tf}"))?;
        info!("Cleared {removed} cached file(s) for {tf}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli.log_level, cli.log_dir.as_deref())?;

    let store = SeriesStore::new(&cli.data_dir);

    match &cli.command {
        Commands::Scan(args) => {
            cmd_scan(store, args).await?;
        }
        Commands::Status { tf } => {
            let timeframes = tf.clone().unwrap_or_else(|| Timeframe::ALL.to_vec());
            cmd_status(&store, &timeframes)?;
        }
        Commands::Clear { symbol, tf } => {
            let symbol = symbol.as_deref().map(symbols::normalize_symbol);
            cmd_clear(&store, symbol.as_deref(), tf)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scan_args(args: &[&str]) -> ScanArgs {
        let mut argv = vec!["demandzone", "scan"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Scan(args) => args,
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn parse_scan_defaults() {
        let args = scan_args(&[]);
        assert_eq!(
            args.tf,
            vec![Timeframe::Monthly, Timeframe::Weekly, Timeframe::Daily]
        );
        assert_eq!(args.distance_range, vec![1.0, 5.0]);
        assert!(!args.fresh);
        assert!(!args.no_cache);
        assert_eq!(args.symbols_file, PathBuf::from("StockList.csv"));

        let config = args.detection_config().unwrap();
        assert_eq!(config, DetectionConfig::default());
    }

    #[test]
    fn parse_scan_args() {
        let args = scan_args(&[
            "--tf",
            "1wk",
            "-s",
            "nh.ns,TCS.NS",
            "--fresh",
            "--distance-range",
            "2",
            "6",
            "--min-base",
            "2",
            "--max-base",
            "4",
            "--limit",
            "1",
            "--no-cache",
        ]);

        assert_eq!(args.tf, vec![Timeframe::Weekly]);
        assert_eq!(args.symbols().unwrap(), vec!["NH.NS"]);
        assert!(args.no_cache);

        let config = args.detection_config().unwrap();
        assert!(config.fresh_only);
        assert_eq!(config.distance_range, (2.0, 6.0));
        assert_eq!((config.min_base, config.max_base), (2, 4));
    }

    #[test]
    fn rejects_unknown_timeframe() {
        assert!(Cli::try_parse_from(["demandzone", "scan", "--tf", "1h"]).is_err());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let args = scan_args(&["--distance-range", "5", "1"]);
        assert!(args.detection_config().is_err());

        let args = scan_args(&["--min-base", "3", "--max-base", "2"]);
        assert!(args.detection_config().is_err());
    }

    #[test]
    fn parse_status_and_clear() {
        let cli = Cli::try_parse_from(["demandzone", "status", "--tf", "1d,1mo"]).unwrap();
        match cli.command {
            Commands::Status { tf } => {
                assert_eq!(tf, Some(vec![Timeframe::Daily, Timeframe::Monthly]));
            }
            _ => panic!("expected Status command"),
        }

        let cli =
            Cli::try_parse_from(["demandzone", "clear", "-s", "ITC.NS", "--tf", "1wk"]).unwrap();
        match cli.command {
            Commands::Clear { symbol, tf } => {
                assert_eq!(symbol, Some("ITC.NS".to_string()));
                assert_eq!(tf, vec![Timeframe::Weekly]);
            }
            _ => panic!("expected Clear command"),
        }

        assert!(Cli::try_parse_from(["demandzone", "clear"]).is_err());
    }

    #[test]
    fn global_options() {
        let cli = Cli::try_parse_from([
            "demandzone",
            "--data-dir",
            "/tmp/cache",
            "--log-dir",
            "logs",
            "status",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
        assert_eq!(cli.log_level, "info");
    }
}
