use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zone_scanner_core::export::write_candles_csv;
use zone_scanner_core::zone::{CandidateZone, chart_window};

use crate::scan::SeriesScan;

/// Periods of context kept before and after a zone's first base candle.
const PERIODS_BEFORE: usize = 5;
const PERIODS_AFTER: usize = 10;

pub fn chart_file_name(zone: &CandidateZone) -> String {
    format!(
        "{}_{}_{}_Score{}.csv",
        zone.symbol,
        zone.timeframe,
        zone.start.format("%Y-%m-%d"),
        zone.score
    )
    .replace(' ', "_")
}

/// Write the candle window around every zone for an external chart renderer.
/// Returns the paths written.
pub fn export_chart_windows(dir: &Path, scans: &[SeriesScan]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for scan in scans {
        for zone in &scan.zones {
            let window = chart_window(&scan.series, zone, PERIODS_BEFORE, PERIODS_AFTER);
            if window.is_empty() {
                continue;
            }
            let path = dir.join(chart_file_name(zone));
            write_candles_csv(&path, window)
                .with_context(|| format!("failed to write chart data {}", path.display()))?;
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use zone_scanner_core::zone::{DetectionConfig, detect_zones};
    use zone_scanner_core::{Candle, Series, Timeframe};

    fn pattern() -> Series {
        let rows = [
            (90.0, 92.0, 89.0, 91.0, 1000.0),
            (91.0, 92.0, 89.0, 90.0, 1000.0),
            (88.0, 97.0, 87.0, 96.0, 1000.0),
            (96.0, 100.0, 92.0, 97.0, 1000.0),
            (97.0, 101.0, 93.0, 98.0, 1000.0),
            (98.0, 117.0, 97.0, 116.0, 2000.0),
            (116.0, 116.5, 109.0, 110.0, 1500.0),
            (110.0, 110.5, 103.0, 104.0, 1200.0),
            (104.0, 104.5, 100.0, 101.0, 1100.0),
        ];
        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, &(open, high, low, close, volume))| Candle {
                date: NaiveDate::from_ymd_opt(2024, i as u32 + 1, 1).unwrap(),
                open,
                high,
                low,
                close,
                volume,
            })
            .collect();
        Series::from_candles(candles).0
    }

    #[test]
    fn writes_one_file_per_zone() {
        let series = pattern();
        let zones = detect_zones(&series, Timeframe::Monthly, "TCS.NS", &DetectionConfig::default());
        assert_eq!(zones.len(), 1);
        assert_eq!(chart_file_name(&zones[0]), "TCS.NS_1mo_2024-04-01_Score5.csv");

        let scans = vec![SeriesScan {
            symbol: "TCS.NS".into(),
            timeframe: Timeframe::Monthly,
            series,
            zones,
        }];

        let dir = tempfile::tempdir().unwrap();
        let written = export_chart_windows(dir.path(), &scans).unwrap();
        assert_eq!(written.len(), 1);

        let text = std::fs::read_to_string(&written[0]).unwrap();
        // header plus all nine candles (window is clamped to the series)
        assert_eq!(text.lines().count(), 10);
    }
}
