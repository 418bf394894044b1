//! Demand zone detection over daily, weekly and monthly OHLCV series.

pub mod candle;
pub mod classify;
pub mod error;
pub mod export;
pub mod schema;
pub mod sizing;
pub mod store;
pub mod swing;
pub mod timeframe;
pub mod zone;

pub use candle::{Candle, Series};
pub use error::ScannerError;
pub use timeframe::Timeframe;
pub use zone::{CandidateZone, DetectionConfig, detect_zones};

/// Round to 2 decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(2.9703), 2.97);
        assert_eq!(round2(3.16666), 3.17);
        assert_eq!(round2(-1.005001), -1.01);
        assert_eq!(round2(16268.0), 16268.0);
    }
}
