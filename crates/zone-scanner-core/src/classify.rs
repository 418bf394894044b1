//! Single-candle classifiers used by the zone engine.

use crate::candle::Candle;

/// Body-to-range ratio separating base candles from strong candles.
pub const BODY_RATIO: f64 = 0.5;

/// Green candle whose body covers at least half of its range.
/// A zero-range candle is never strong.
pub fn is_strong_bullish(candle: &Candle) -> bool {
    candle.close > candle.open && candle.body().abs() >= BODY_RATIO * candle.range()
}

/// Small-bodied consolidation candle: body under half of a non-zero range.
pub fn is_base_candle(candle: &Candle) -> bool {
    let range = candle.range();
    candle.body().abs() < BODY_RATIO * range && range > 0.0
}
