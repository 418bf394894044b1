use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::candle::Candle;
use crate::error::ScannerError;
use crate::zone::CandidateZone;

/// Header row of the zone CSV, in `ZoneRecord` field order.
pub const ZONE_COLUMNS: [&str; 20] = [
    "Symbol",
    "Timeframe",
    "Start",
    "Entry",
    "StopLoss",
    "Equilibrium",
    "GreenAfterLegOut",
    "Score",
    "Fresh",
    "LegoutStrength",
    "BaseCount",
    "ZoneType",
    "NearestSupport",
    "NearestResistance",
    "SRZonePosition",
    "Distance",
    "RRRatio",
    "StopLossPct",
    "Quantity",
    "PositionSize",
];

/// Flat export row for one zone. Column names are stable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRecord {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Timeframe")]
    pub timeframe: String,
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "Entry")]
    pub entry: f64,
    #[serde(rename = "StopLoss")]
    pub stop_loss: f64,
    #[serde(rename = "Equilibrium")]
    pub equilibrium: f64,
    #[serde(rename = "GreenAfterLegOut")]
    pub green_after_leg_out: usize,
    #[serde(rename = "Score")]
    pub score: u8,
    #[serde(rename = "Fresh")]
    pub fresh: bool,
    #[serde(rename = "LegoutStrength")]
    pub legout_strength: f64,
    #[serde(rename = "BaseCount")]
    pub base_count: usize,
    #[serde(rename = "ZoneType")]
    pub zone_type: String,
    #[serde(rename = "NearestSupport")]
    pub nearest_support: Option<f64>,
    #[serde(rename = "NearestResistance")]
    pub nearest_resistance: Option<f64>,
    #[serde(rename = "SRZonePosition")]
    pub sr_zone_position: String,
    #[serde(rename = "Distance")]
    pub distance: f64,
    #[serde(rename = "RRRatio")]
    pub rr_ratio: Option<f64>,
    #[serde(rename = "StopLossPct")]
    pub stop_loss_pct: f64,
    #[serde(rename = "Quantity")]
    pub quantity: u64,
    #[serde(rename = "PositionSize")]
    pub position_size: f64,
}

impl From<&CandidateZone> for ZoneRecord {
    fn from(zone: &CandidateZone) -> Self {
        Self {
            symbol: zone.symbol.clone(),
            timeframe: zone.timeframe.to_string(),
            start: zone.start.format("%Y-%m-%d").to_string(),
            entry: zone.proximal,
            stop_loss: zone.distal,
            equilibrium: zone.equilibrium,
            green_after_leg_out: zone.green_after_leg_out,
            score: zone.score,
            fresh: zone.fresh,
            legout_strength: zone.leg_out_strength,
            base_count: zone.base_count,
            zone_type: zone.zone_type.to_string(),
            nearest_support: zone.nearest_support,
            nearest_resistance: zone.nearest_resistance,
            sr_zone_position: zone.sr_position.label().to_string(),
            distance: zone.distance_pct,
            rr_ratio: zone.rr_ratio,
            stop_loss_pct: zone.stop_loss_pct,
            quantity: zone.quantity,
            position_size: zone.position_size,
        }
    }
}

/// Write zones as CSV rows, in the order given.
/// The header row is always written, so no zones gives a header-only file.
pub fn write_zones<W: Write>(writer: W, zones: &[CandidateZone]) -> Result<(), ScannerError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(ZONE_COLUMNS)?;
    for zone in zones {
        csv.serialize(ZoneRecord::from(zone))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_zones_csv(path: &Path, zones: &[CandidateZone]) -> Result<(), ScannerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    write_zones(std::fs::File::create(path)?, zones)
}

/// Write a candle slice (e.g. a chart window) as CSV.
pub fn write_candles_csv(path: &Path, candles: &[Candle]) -> Result<(), ScannerError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut csv = csv::Writer::from_path(path)?;
    for candle in candles {
        csv.serialize(candle)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::tests::date;
    use crate::timeframe::Timeframe;
    use crate::zone::SrPosition;

    fn zone() -> CandidateZone {
        CandidateZone {
            symbol: "ITC.NS".into(),
            timeframe: Timeframe::Monthly,
            zone_type: Timeframe::Monthly.zone_type(),
            start: date(2024, 3, 1),
            leg_in_date: date(2024, 2, 1),
            leg_out_date: date(2024, 5, 1),
            proximal: 98.0,
            distal: 92.0,
            equilibrium: 95.0,
            base_count: 2,
            leg_in_strength: 8.0,
            leg_out_strength: 18.0,
            fresh: true,
            volume_spike: true,
            score: 5,
            green_after_leg_out: 1,
            distance_pct: 2.97,
            nearest_support: None,
            nearest_resistance: Some(117.0),
            sr_position: SrPosition::BelowResistance,
            stop_loss_value: 6.0,
            stop_loss_pct: 6.12,
            quantity: 166,
            position_size: 16268.0,
            rr_ratio: Some(3.17),
        }
    }

    #[test]
    fn header_and_row_layout() {
        let mut buf = Vec::new();
        write_zones(&mut buf, &[zone()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Symbol,Timeframe,Start,Entry,StopLoss,Equilibrium,GreenAfterLegOut,Score,Fresh,\
             LegoutStrength,BaseCount,ZoneType,NearestSupport,NearestResistance,SRZonePosition,\
             Distance,RRRatio,StopLossPct,Quantity,PositionSize"
        );
        assert_eq!(
            lines.next().unwrap(),
            "ITC.NS,1mo,2024-03-01,98.0,92.0,95.0,1,5,true,18.0,2,MIT,,117.0,Below Resistance,\
             2.97,3.17,6.12,166,16268.0"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_zone_list_writes_header_only() {
        let mut buf = Vec::new();
        write_zones(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.trim_end(), ZONE_COLUMNS.join(","));
    }

    #[test]
    fn empty_scan_replaces_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demand_zones.csv");
        write_zones_csv(&path, &[zone()]).unwrap();
        write_zones_csv(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), ZONE_COLUMNS.join(","));
    }

    #[test]
    fn writes_files_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/demand_zones.csv");
        write_zones_csv(&path, &[zone()]).unwrap();
        assert!(path.exists());

        let chart = dir.path().join("charts/ITC_1mo.csv");
        let candles = vec![Candle {
            date: date(2024, 3, 1),
            open: 96.0,
            high: 100.0,
            low: 92.0,
            close: 97.0,
            volume: 1000.0,
        }];
        write_candles_csv(&chart, &candles).unwrap();
        let text = std::fs::read_to_string(chart).unwrap();
        assert!(text.starts_with("date,open,high,low,close,volume"));
    }
}
