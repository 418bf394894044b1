use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Candle period a series is sampled at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// `1d`
    Daily,
    /// `1wk`
    Weekly,
    /// `1mo`
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Monthly, Timeframe::Weekly, Timeframe::Daily];

    /// Interval label as used by the data provider and in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
            Timeframe::Monthly => "1mo",
        }
    }

    pub fn zone_type(&self) -> ZoneType {
        match self {
            Timeframe::Daily => ZoneType::Dit,
            Timeframe::Weekly => ZoneType::Wit,
            Timeframe::Monthly => ZoneType::Mit,
        }
    }

    /// First date of the default history window ending at `today`.
    /// Daily: 1825 days, weekly: 5 years, monthly: 15 years.
    pub fn history_start(&self, today: NaiveDate) -> NaiveDate {
        let start = match self {
            Timeframe::Daily => today.checked_sub_days(Days::new(1825)),
            Timeframe::Weekly => today.checked_sub_months(Months::new(12 * 5)),
            Timeframe::Monthly => today.checked_sub_months(Months::new(12 * 15)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeframeError(String);

impl fmt::Display for ParseTimeframeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown timeframe '{}', expected 1d, 1wk or 1mo", self.0)
    }
}

impl std::error::Error for ParseTimeframeError {}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Timeframe::Daily),
            "1wk" => Ok(Timeframe::Weekly),
            "1mo" => Ok(Timeframe::Monthly),
            other => Err(ParseTimeframeError(other.to_string())),
        }
    }
}

/// Zone label derived from the timeframe a zone was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    /// Month-in-time
    #[serde(rename = "MIT")]
    Mit,
    /// Week-in-time
    #[serde(rename = "WIT")]
    Wit,
    /// Day-in-time
    #[serde(rename = "DIT")]
    Dit,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Mit => "MIT",
            ZoneType::Wit => "WIT",
            ZoneType::Dit => "DIT",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
