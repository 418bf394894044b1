use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::candle::{Candle, Series};
use crate::classify::{is_base_candle, is_strong_bullish};
use crate::round2;
use crate::sizing::SizingConfig;
use crate::swing::{SwingConfig, SwingLevels, detect_swing_levels};
use crate::timeframe::{Timeframe, ZoneType};

/// Leg-out volume must exceed this multiple of the mean base volume.
const VOLUME_SPIKE_FACTOR: f64 = 1.5;
/// Zones scoring below this are dropped.
pub const MIN_SCORE: u8 = 3;

/// Parameters for a detection pass over one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionConfig {
    /// Drop zones that price has traded back into.
    pub fresh_only: bool,
    pub min_base: usize,
    pub max_base: usize,
    /// Inclusive band, in percent, for the distance from current price down to proximal.
    pub distance_range: (f64, f64),
    pub swing: SwingConfig,
    pub sizing: SizingConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fresh_only: false,
            min_base: 1,
            max_base: 3,
            distance_range: (1.0, 5.0),
            swing: SwingConfig::default(),
            sizing: SizingConfig::default(),
        }
    }
}

/// Where the proximal line sits relative to the surrounding swing levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SrPosition {
    AtSupport,
    AtResistance,
    Between,
    AboveSupport,
    BelowResistance,
    Unanchored,
}

impl SrPosition {
    /// Classify `price` against its nearest levels. A level is touching when
    /// the distance relative to the level is below `tolerance`, the same rule
    /// swing level clustering uses.
    pub fn classify(
        price: f64,
        support: Option<f64>,
        resistance: Option<f64>,
        tolerance: f64,
    ) -> Self {
        let touching = |level: f64| level > 0.0 && (price - level).abs() / level < tolerance;

        match (support, resistance) {
            (Some(s), _) if touching(s) => SrPosition::AtSupport,
            (_, Some(r)) if touching(r) => SrPosition::AtResistance,
            (Some(_), Some(_)) => SrPosition::Between,
            (Some(_), None) => SrPosition::AboveSupport,
            (None, Some(_)) => SrPosition::BelowResistance,
            (None, None) => SrPosition::Unanchored,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SrPosition::AtSupport => "At Support",
            SrPosition::AtResistance => "At Resistance",
            SrPosition::Between => "Between",
            SrPosition::AboveSupport => "Above Support",
            SrPosition::BelowResistance => "Below Resistance",
            SrPosition::Unanchored => "Unanchored",
        }
    }
}

/// A basing pattern between two strong bullish candles that survived every filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateZone {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub zone_type: ZoneType,
    /// Date of the first base candle.
    pub start: NaiveDate,
    pub leg_in_date: NaiveDate,
    pub leg_out_date: NaiveDate,
    pub proximal: f64,
    pub distal: f64,
    pub equilibrium: f64,
    pub base_count: usize,
    pub leg_in_strength: f64,
    pub leg_out_strength: f64,
    pub fresh: bool,
    pub volume_spike: bool,
    pub score: u8,
    pub green_after_leg_out: usize,
    pub distance_pct: f64,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    pub sr_position: SrPosition,
    pub stop_loss_value: f64,
    pub stop_loss_pct: f64,
    pub quantity: u64,
    pub position_size: f64,
    pub rr_ratio: Option<f64>,
}

/// Detect demand zones, computing swing levels for the series first.
pub fn detect_zones(
    series: &Series,
    timeframe: Timeframe,
    symbol: &str,
    config: &DetectionConfig,
) -> Vec<CandidateZone> {
    let levels = detect_swing_levels(series.candles(), &config.swing);
    detect_zones_with_levels(series, timeframe, symbol, config, &levels)
}

/// Detect demand zones using precomputed swing levels.
///
/// Every start index `i` is tried with the longest base first; the first base
/// length that yields a zone ends the search for that index. Rejections are
/// silent: an empty result means no qualifying zone, not a failure.
pub fn detect_zones_with_levels(
    series: &Series,
    timeframe: Timeframe,
    symbol: &str,
    config: &DetectionConfig,
    levels: &SwingLevels,
) -> Vec<CandidateZone> {
    let candles = series.candles();
    let len = candles.len();
    let mut zones = Vec::new();

    let Some(last_close) = series.last_close() else {
        return zones;
    };
    if config.min_base == 0 || config.min_base > config.max_base {
        return zones;
    }

    for i in 3..len.saturating_sub(4) {
        let leg_in = &candles[i - 1];

        for base_len in (config.min_base..=config.max_base).rev() {
            let trial = Trial {
                candles,
                start: i,
                base_len,
                leg_in,
                last_close,
            };
            if let Some(zone) = trial.evaluate(timeframe, symbol, config, levels) {
                zones.push(zone);
                break;
            }
        }
    }

    zones
}

/// One `(start, base length)` pair checked against every filter in turn.
struct Trial<'a> {
    candles: &'a [Candle],
    start: usize,
    base_len: usize,
    leg_in: &'a Candle,
    last_close: f64,
}

impl Trial<'_> {
    /// `None` means the trial was rejected at some step.
    fn evaluate(
        &self,
        timeframe: Timeframe,
        symbol: &str,
        config: &DetectionConfig,
        levels: &SwingLevels,
    ) -> Option<CandidateZone> {
        let Trial {
            candles,
            start,
            base_len,
            leg_in,
            last_close,
        } = *self;

        let leg_out_idx = start + base_len;
        if leg_out_idx + 1 >= candles.len() {
            return None;
        }

        let base = &candles[start..leg_out_idx];
        if !base.iter().all(is_base_candle) {
            return None;
        }

        let leg_out = &candles[leg_out_idx];
        if !is_strong_bullish(leg_in) || !is_strong_bullish(leg_out) {
            return None;
        }

        let proximal = base.iter().map(|c| c.close).fold(f64::MIN, f64::max);
        let distal = base.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        let after = &candles[leg_out_idx + 1..];
        let fresh = !after.iter().any(|c| c.low <= proximal);
        if config.fresh_only && !fresh {
            return None;
        }

        let base_volume = base.iter().map(|c| c.volume).sum::<f64>() / base_len as f64;
        let volume_spike = base_volume > 0.0 && leg_out.volume > VOLUME_SPIKE_FACTOR * base_volume;

        // leg-in is measured as an absolute body, leg-out keeps its sign
        let leg_in_strength = leg_in.body().abs();
        let leg_out_strength = leg_out.body();
        let score = score_zone(fresh, leg_in_strength, leg_out_strength, volume_spike);
        if score < MIN_SCORE {
            return None;
        }

        let distance_pct = round2((last_close - proximal) / last_close * 100.0);
        let (min_dist, max_dist) = config.distance_range;
        if !(min_dist..=max_dist).contains(&distance_pct) {
            return None;
        }

        let nearest_support = levels.nearest_support(proximal);
        let nearest_resistance = levels.nearest_resistance(proximal);

        let sizing = config.sizing.size(proximal, distal, nearest_resistance);
        if !config.sizing.passes(&sizing) {
            return None;
        }

        let green_after_leg_out = after.iter().take_while(|c| c.is_green()).count();

        Some(CandidateZone {
            symbol: symbol.to_string(),
            timeframe,
            zone_type: timeframe.zone_type(),
            start: base[0].date,
            leg_in_date: leg_in.date,
            leg_out_date: leg_out.date,
            proximal: round2(proximal),
            distal: round2(distal),
            equilibrium: round2((proximal + distal) / 2.0),
            base_count: base_len,
            leg_in_strength: round2(leg_in_strength),
            leg_out_strength: round2(leg_out_strength),
            fresh,
            volume_spike,
            score,
            green_after_leg_out,
            distance_pct,
            nearest_support,
            nearest_resistance,
            sr_position: SrPosition::classify(
                proximal,
                nearest_support,
                nearest_resistance,
                config.swing.tolerance,
            ),
            stop_loss_value: sizing.stop_loss_value,
            stop_loss_pct: sizing.stop_loss_pct,
            quantity: sizing.quantity,
            position_size: sizing.position_size,
            rr_ratio: sizing.rr_ratio,
        })
    }
}

/// Freshness counts 2 (1 if revisited), a leg-out more than twice the leg-in
/// counts 2 (else 1), and a volume spike adds 1.
pub fn score_zone(
    fresh: bool,
    leg_in_strength: f64,
    leg_out_strength: f64,
    volume_spike: bool,
) -> u8 {
    let freshness = if fresh { 2 } else { 1 };
    let departure = if leg_out_strength > 2.0 * leg_in_strength {
        2
    } else {
        1
    };
    freshness + departure + u8::from(volume_spike)
}

/// Rank zones best first: score descending, then symbol, timeframe and start date.
pub fn rank_zones(zones: &mut [CandidateZone]) {
    zones.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.timeframe.cmp(&b.timeframe))
            .then_with(|| a.start.cmp(&b.start))
    });
}

/// Candles around a zone for charting: `before` periods ahead of the first
/// base candle through `after` periods past it, clamped to the series.
pub fn chart_window<'a>(
    series: &'a Series,
    zone: &CandidateZone,
    before: usize,
    after: usize,
) -> &'a [Candle] {
    let candles = series.candles();
    let Some(start) = series.position(zone.start) else {
        return &[];
    };
    let from = start.saturating_sub(before);
    let to = (start + after + 1).min(candles.len());
    &candles[from..to]
}
