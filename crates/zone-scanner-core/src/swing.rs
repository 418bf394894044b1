use serde::{Deserialize, Serialize};

use crate::candle::Candle;
use crate::round2;

/// Parameters for swing high/low detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingConfig {
    /// Candles required on each side of a swing point.
    pub swing: usize,
    /// Relative distance under which a new level merges into an existing one.
    pub tolerance: f64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            swing: 2,
            tolerance: 0.015,
        }
    }
}

/// Support and resistance levels of one series, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingLevels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl SwingLevels {
    /// Highest support level at or below `price`.
    pub fn nearest_support(&self, price: f64) -> Option<f64> {
        self.support.iter().copied().filter(|&s| s <= price).reduce(f64::max)
    }

    /// Lowest resistance level at or above `price`.
    pub fn nearest_resistance(&self, price: f64) -> Option<f64> {
        self.resistance
            .iter()
            .copied()
            .filter(|&r| r >= price)
            .reduce(f64::min)
    }
}

/// Find swing highs (resistance) and swing lows (support).
///
/// A level is kept only if no previously accepted level of the same kind lies
/// within `tolerance` of it, scanning chronologically, so the earlier swing
/// point wins. Output levels are rounded to 2 decimals.
pub fn detect_swing_levels(candles: &[Candle], config: &SwingConfig) -> SwingLevels {
    let swing = config.swing;
    let mut support: Vec<f64> = Vec::new();
    let mut resistance: Vec<f64> = Vec::new();

    if swing == 0 || candles.len() < 2 * swing + 1 {
        return SwingLevels::default();
    }

    let near = |levels: &[f64], price: f64| {
        levels
            .iter()
            .any(|&l| (price - l).abs() / l < config.tolerance)
    };

    for i in swing..candles.len() - swing {
        let high = candles[i].high;
        let low = candles[i].low;

        let is_res = (1..=swing).all(|j| high > candles[i - j].high && high > candles[i + j].high);
        if is_res && !near(&resistance, high) {
            resistance.push(high);
        }

        let is_sup = (1..=swing).all(|j| low < candles[i - j].low && low < candles[i + j].low);
        if is_sup && !near(&support, low) {
            support.push(low);
        }
    }

    SwingLevels {
        support: finalize(support),
        resistance: finalize(resistance),
    }
}

fn finalize(levels: Vec<f64>) -> Vec<f64> {
    let mut rounded: Vec<f64> = levels.into_iter().map(round2).collect();
    rounded.sort_by(f64::total_cmp);
    rounded.dedup();
    rounded
}
