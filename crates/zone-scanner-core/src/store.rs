use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::candle::{Candle, Series};
use crate::error::ScannerError;
use crate::schema;
use crate::timeframe::Timeframe;

/// Filesystem-backed cache of OHLCV series in Parquet format.
///
/// Directory layout: `{root}/{TIMEFRAME}/{SYMBOL}.parquet`
pub struct SeriesStore {
    root: PathBuf,
}

impl SeriesStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn timeframe_dir(&self, timeframe: Timeframe) -> PathBuf {
        self.root.join(timeframe.as_str())
    }

    /// Path to the Parquet file for a symbol and timeframe.
    pub fn file_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.timeframe_dir(timeframe)
            .join(format!("{symbol}.parquet"))
    }

    pub fn has_data(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.file_path(symbol, timeframe).exists()
    }

    /// Write a series, creating parent directories and overwriting any existing file.
    pub fn write(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        series: &Series,
    ) -> Result<(), ScannerError> {
        let path = self.file_path(symbol, timeframe);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        schema::write_parquet(&path, series.candles())
    }

    /// Read the cached series. Malformed rows in the file are dropped.
    pub fn read(&self, symbol: &str, timeframe: Timeframe) -> Result<Series, ScannerError> {
        let path = self.file_path(symbol, timeframe);
        if !path.exists() {
            return Err(ScannerError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        let (series, _rejected) = Series::from_candles(schema::read_parquet(&path)?);
        Ok(series)
    }

    /// Cached series, or an empty one if nothing is cached.
    pub fn read_or_empty(&self, symbol: &str, timeframe: Timeframe) -> Result<Series, ScannerError> {
        match self.read(symbol, timeframe) {
            Err(ScannerError::DataUnavailable { .. }) => Ok(Series::default()),
            other => other,
        }
    }

    /// Date of the newest cached candle.
    pub fn last_date(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Option<NaiveDate>, ScannerError> {
        Ok(self.read_or_empty(symbol, timeframe)?.last_date())
    }

    /// Merge fresh candles into the cached series (newer rows win on a
    /// duplicate date), persist the result and return it with any rows that
    /// failed validation.
    pub fn merge_and_write(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cached: &Series,
        fresh: Vec<Candle>,
    ) -> Result<(Series, Vec<ScannerError>), ScannerError> {
        let (merged, rejected) = cached.merge(fresh);
        if merged.is_empty() {
            return Err(ScannerError::DataUnavailable {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        self.write(symbol, timeframe, &merged)?;
        Ok((merged, rejected))
    }

    /// Symbols cached for a timeframe, sorted.
    pub fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, ScannerError> {
        let dir = self.timeframe_dir(timeframe);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if entry.file_type()?.is_file()
                && let Some(symbol) = name.strip_suffix(".parquet")
            {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Delete the cache for one symbol, or for every symbol of the timeframe.
    /// Returns the number of files removed.
    pub fn clear(&self, symbol: Option<&str>, timeframe: Timeframe) -> Result<usize, ScannerError> {
        let symbols = match symbol {
            Some(s) => vec![s.to_string()],
            None => self.list_symbols(timeframe)?,
        };

        let mut removed = 0;
        for symbol in symbols {
            let path = self.file_path(&symbol, timeframe);
            if path.exists() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
