use serde::{Deserialize, Serialize};

use crate::round2;

/// Capital and risk limits applied to every candidate zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingConfig {
    pub capital: f64,
    /// Fraction of capital risked per trade.
    pub risk_pct: f64,
    /// Minimum reward/risk ratio for a zone to be reported.
    pub min_rr: f64,
    /// Maximum position value as a fraction of capital.
    pub max_position_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            capital: 100_000.0,
            risk_pct: 0.01,
            min_rr: 1.5,
            max_position_pct: 0.2,
        }
    }
}

impl SizingConfig {
    pub fn size(&self, entry: f64, stop: f64, resistance: Option<f64>) -> PositionSizing {
        calculate_position_size(entry, stop, resistance, self.capital, self.risk_pct)
    }

    /// Whether a sized zone clears the reward/risk floor and the position cap.
    pub fn passes(&self, sizing: &PositionSizing) -> bool {
        let Some(rr) = sizing.rr_ratio else {
            return false;
        };
        rr >= self.min_rr && sizing.position_size <= self.max_position_pct * self.capital
    }
}

/// Advisory position figures for a long entry at the proximal line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    pub stop_loss_value: f64,
    pub stop_loss_pct: f64,
    pub quantity: u64,
    pub position_size: f64,
    pub rr_ratio: Option<f64>,
}

impl PositionSizing {
    pub fn no_trade() -> Self {
        Self {
            stop_loss_value: 0.0,
            stop_loss_pct: 0.0,
            quantity: 0,
            position_size: 0.0,
            rr_ratio: None,
        }
    }
}

/// Size a position so that hitting `stop` loses `capital * risk_pct`.
///
/// Returns [`PositionSizing::no_trade`] for non-positive prices or a stop
/// distance that rounds to zero or below.
pub fn calculate_position_size(
    entry: f64,
    stop: f64,
    resistance: Option<f64>,
    capital: f64,
    risk_pct: f64,
) -> PositionSizing {
    if !(entry > 0.0 && stop > 0.0) {
        return PositionSizing::no_trade();
    }

    let stop_loss_value = round2(entry - stop);
    if stop_loss_value <= 0.0 {
        return PositionSizing::no_trade();
    }

    let capital_to_risk = capital * risk_pct;
    let quantity = (capital_to_risk / stop_loss_value).floor().max(0.0) as u64;
    let position_size = round2(quantity as f64 * entry);

    let rr_ratio = resistance
        .filter(|&r| r > 0.0)
        .map(|r| round2((r - entry) / stop_loss_value));

    PositionSizing {
        stop_loss_value,
        stop_loss_pct: round2(stop_loss_value / entry * 100.0),
        quantity,
        position_size,
        rr_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_by_risked_capital() {
        let s = calculate_position_size(98.0, 92.0, Some(117.0), 100_000.0, 0.01);
        assert_eq!(s.stop_loss_value, 6.0);
        assert_eq!(s.quantity, 166);
        assert_eq!(s.position_size, 16268.0);
        assert_eq!(s.rr_ratio, Some(3.17));
        assert_eq!(s.stop_loss_pct, 6.12);
    }

    #[test]
    fn zero_stop_distance_is_no_trade() {
        let s = calculate_position_size(100.0, 100.0, Some(120.0), 100_000.0, 0.01);
        assert_eq!(s.quantity, 0);
        assert_eq!(s.rr_ratio, None);
        assert_eq!(s, PositionSizing::no_trade());
    }

    #[test]
    fn stop_above_entry_is_no_trade() {
        let s = calculate_position_size(100.0, 105.0, Some(120.0), 100_000.0, 0.01);
        assert_eq!(s, PositionSizing::no_trade());
    }

    #[test]
    fn distance_rounding_to_zero_is_no_trade() {
        let s = calculate_position_size(100.001, 100.0, Some(120.0), 100_000.0, 0.01);
        assert_eq!(s, PositionSizing::no_trade());
    }

    #[test]
    fn non_positive_prices_are_no_trade() {
        assert_eq!(
            calculate_position_size(0.0, -1.0, None, 100_000.0, 0.01),
            PositionSizing::no_trade()
        );
        assert_eq!(
            calculate_position_size(100.0, 0.0, None, 100_000.0, 0.01),
            PositionSizing::no_trade()
        );
    }

    #[test]
    fn missing_or_non_positive_resistance_has_no_ratio() {
        let s = calculate_position_size(100.0, 90.0, None, 100_000.0, 0.01);
        assert_eq!(s.quantity, 100);
        assert_eq!(s.rr_ratio, None);

        let s = calculate_position_size(100.0, 90.0, Some(0.0), 100_000.0, 0.01);
        assert_eq!(s.rr_ratio, None);
    }

    #[test]
    fn gate_requires_ratio_and_caps_position() {
        let config = SizingConfig::default();

        let ok = config.size(98.0, 92.0, Some(117.0));
        assert!(config.passes(&ok));

        let low_rr = config.size(98.0, 92.0, Some(104.0));
        assert_eq!(low_rr.rr_ratio, Some(1.0));
        assert!(!config.passes(&low_rr));

        let no_rr = config.size(98.0, 92.0, None);
        assert!(!config.passes(&no_rr));

        // 1000 shares at 98 is far over 20% of capital
        let too_big = config.size(98.0, 97.0, Some(117.0));
        assert_eq!(too_big.quantity, 1000);
        assert!(!config.passes(&too_big));
    }
}
