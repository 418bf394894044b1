use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ScannerError;

/// A single OHLCV candle for one daily, weekly or monthly period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Signed body: positive for a green candle.
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    /// Check the OHLC ordering and value constraints of a single row.
    pub fn validate(&self) -> Result<(), ScannerError> {
        let malformed = |reason: &str| ScannerError::MalformedCandle {
            date: self.date,
            reason: reason.to_string(),
        };

        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(malformed("non-finite value"));
        }
        if self.volume < 0.0 {
            return Err(malformed("negative volume"));
        }
        if self.high < self.low {
            return Err(malformed("high below low"));
        }
        if self.high < self.open.max(self.close) {
            return Err(malformed("high below open/close"));
        }
        if self.low > self.open.min(self.close) {
            return Err(malformed("low above open/close"));
        }
        Ok(())
    }
}

/// Candles for one symbol and timeframe, ascending by date with no duplicate dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Build a series from raw rows.
    ///
    /// Rows are sorted by date and a later row replaces an earlier one with the
    /// same date. Malformed rows are dropped and handed back so the caller can
    /// report them; they never abort the series.
    pub fn from_candles(candles: Vec<Candle>) -> (Self, Vec<ScannerError>) {
        let mut rejected = Vec::new();
        let mut by_date = BTreeMap::new();

        for candle in candles {
            match candle.validate() {
                Ok(()) => {
                    by_date.insert(candle.date, candle);
                }
                Err(e) => rejected.push(e),
            }
        }

        let series = Self {
            candles: by_date.into_values().collect(),
        };
        (series, rejected)
    }

    /// Combine with newer rows, the newer row winning on a duplicate date.
    pub fn merge(&self, newer: Vec<Candle>) -> (Self, Vec<ScannerError>) {
        let mut combined = self.candles.clone();
        combined.extend(newer);
        Self::from_candles(combined)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.candles.first().map(|c| c.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.candles.last().map(|c| c.date)
    }

    /// Close of the final candle, i.e. the current price.
    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Candles whose date lies in `[from, to]`.
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> &[Candle] {
        let start = self.candles.partition_point(|c| c.date < from);
        let end = self.candles.partition_point(|c| c.date <= to);
        if start >= end {
            return &[];
        }
        &self.candles[start..end]
    }

    /// Index of the candle dated exactly `date`.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.candles.binary_search_by_key(&date, |c| c.date).ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn candle(day: u32, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            date: date(2025, 1, day),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn body_range_and_color() {
        let c = candle(2, 100.0, 105.0, 98.0, 103.0);
        assert_eq!(c.body(), 3.0);
        assert_eq!(c.range(), 7.0);
        assert!(c.is_green());

        let red = candle(3, 103.0, 104.0, 99.0, 100.0);
        assert_eq!(red.body(), -3.0);
        assert!(!red.is_green());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let c = candle(2, 100.0, 98.0, 101.0, 99.0);
        assert!(matches!(
            c.validate(),
            Err(ScannerError::MalformedCandle { .. })
        ));
    }

    #[test]
    fn validate_rejects_close_outside_range() {
        let c = candle(2, 100.0, 101.0, 99.0, 102.0);
        assert!(c.validate().is_err());

        let c = candle(2, 100.0, 101.0, 99.0, 98.0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_and_negative_volume() {
        let c = candle(2, f64::NAN, 101.0, 99.0, 100.0);
        assert!(c.validate().is_err());

        let mut c = candle(2, 100.0, 101.0, 99.0, 100.5);
        c.volume = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn from_candles_sorts_and_drops_malformed() {
        let rows = vec![
            candle(3, 100.0, 101.0, 99.0, 100.5),
            candle(2, 100.0, 98.0, 101.0, 99.0), // malformed
            candle(1, 99.0, 100.0, 98.0, 99.5),
        ];

        let (series, rejected) = Series::from_candles(rows);
        assert_eq!(series.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert_eq!(series.first_date(), Some(date(2025, 1, 1)));
        assert_eq!(series.last_date(), Some(date(2025, 1, 3)));
        assert_eq!(series.last_close(), Some(100.5));
    }

    #[test]
    fn from_candles_duplicate_date_last_wins() {
        let rows = vec![
            candle(1, 99.0, 100.0, 98.0, 99.5),
            candle(1, 99.0, 102.0, 98.0, 101.0),
        ];

        let (series, rejected) = Series::from_candles(rows);
        assert!(rejected.is_empty());
        assert_eq!(series.len(), 1);
        assert_eq!(series.candles()[0].close, 101.0);
    }

    #[test]
    fn merge_prefers_newer_rows() {
        let (cached, _) = Series::from_candles(vec![
            candle(1, 99.0, 100.0, 98.0, 99.5),
            candle(2, 99.5, 101.0, 99.0, 100.0),
        ]);

        let (merged, rejected) = cached.merge(vec![
            candle(2, 99.5, 103.0, 99.0, 102.5),
            candle(3, 102.5, 104.0, 102.0, 103.0),
        ]);

        assert!(rejected.is_empty());
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.candles()[1].close, 102.5);
        assert_eq!(merged.last_close(), Some(103.0));
    }

    #[test]
    fn window_is_inclusive() {
        let (series, _) = Series::from_candles(
            (1..=10)
                .map(|d| candle(d, 100.0, 101.0, 99.0, 100.5))
                .collect(),
        );

        let w = series.window(date(2025, 1, 3), date(2025, 1, 6));
        assert_eq!(w.len(), 4);
        assert_eq!(w[0].date, date(2025, 1, 3));
        assert_eq!(w[3].date, date(2025, 1, 6));

        assert!(series.window(date(2025, 1, 6), date(2025, 1, 3)).is_empty());
        assert_eq!(series.position(date(2025, 1, 5)), Some(4));
        assert_eq!(series.position(date(2025, 2, 5)), None);
    }
}
