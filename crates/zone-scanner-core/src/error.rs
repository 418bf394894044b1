use thiserror::Error;

use crate::timeframe::Timeframe;

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No data available for {symbol} [{timeframe}]")]
    DataUnavailable {
        symbol: String,
        timeframe: Timeframe,
    },

    #[error("Malformed candle on {date}: {reason}")]
    MalformedCandle {
        date: chrono::NaiveDate,
        reason: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
