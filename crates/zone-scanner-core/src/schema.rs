use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::candle::Candle;
use crate::error::ScannerError;

const UNIX_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

pub fn candle_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("open", DataType::Float64, false),
        Field::new("high", DataType::Float64, false),
        Field::new("low", DataType::Float64, false),
        Field::new("close", DataType::Float64, false),
        Field::new("volume", DataType::Float64, false),
    ])
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - UNIX_EPOCH).num_days() as i32
}

pub fn candles_to_record_batch(candles: &[Candle]) -> Result<RecordBatch, ScannerError> {
    let schema = Arc::new(candle_schema());

    let dates: Vec<i32> = candles.iter().map(|c| days_since_epoch(c.date)).collect();
    let column = |f: fn(&Candle) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(
            candles.iter().map(f).collect::<Vec<f64>>(),
        ))
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(dates)),
        column(|c| c.open),
        column(|c| c.high),
        column(|c| c.low),
        column(|c| c.close),
        column(|c| c.volume),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, ScannerError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<Float64Array>())
        .ok_or_else(|| ScannerError::InvalidData(format!("expected {name} column")))
}

pub fn record_batch_to_candles(batch: &RecordBatch) -> Result<Vec<Candle>, ScannerError> {
    let dates = batch
        .column_by_name("date")
        .and_then(|col| col.as_any().downcast_ref::<Date32Array>())
        .ok_or_else(|| ScannerError::InvalidData("expected date column".into()))?;

    let opens = float_column(batch, "open")?;
    let highs = float_column(batch, "high")?;
    let lows = float_column(batch, "low")?;
    let closes = float_column(batch, "close")?;
    let volumes = float_column(batch, "volume")?;

    let mut candles = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let days = dates.value(i);
        let date = UNIX_EPOCH
            .checked_add_signed(chrono::Duration::days(days.into()))
            .ok_or_else(|| ScannerError::InvalidData(format!("invalid date: {days}")))?;

        candles.push(Candle {
            date,
            open: opens.value(i),
            high: highs.value(i),
            low: lows.value(i),
            close: closes.value(i),
            volume: volumes.value(i),
        });
    }

    Ok(candles)
}

pub fn write_parquet(path: &Path, candles: &[Candle]) -> Result<(), ScannerError> {
    let batch = candles_to_record_batch(candles)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<Vec<Candle>, ScannerError> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut all_candles = Vec::new();
    for batch in reader {
        let batch = batch?;
        let mut candles = record_batch_to_candles(&batch)?;
        all_candles.append(&mut candles);
    }

    Ok(all_candles)
}
