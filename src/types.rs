//! Shared data structures for the aurora decision pipeline
//!
//! This module defines the core types flowing through the pipeline:
//! - Telemetry: SpaceWeatherReading (normalized L1 solar-wind snapshot)
//! - Sky: DarknessInfo, CloudConditions
//! - Output: Decision (GO / NO-GO with reason and confidence)
//! - Retrospective: DailySummary

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Provenance
// ============================================================================

/// Where a reading or cloud report actually came from.
///
/// `Degraded` marks a substituted fallback produced when the upstream feed
/// failed or returned no valid rows. The decision pipeline keeps running on
/// degraded data but callers and tests can assert on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    Live,
    Degraded,
}

impl Provenance {
    pub fn is_degraded(self) -> bool {
        self == Provenance::Degraded
    }
}

// ============================================================================
// Telemetry
// ============================================================================

/// Official geomagnetic storm scale (G0-G5), observed and predicted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StormScale {
    /// Currently observed G level, if the scale table was available.
    pub observed: Option<u8>,
    /// Predicted G level for the next day, if available.
    pub predicted: Option<u8>,
}

/// Normalized, current-moment space-weather snapshot.
///
/// Produced by the telemetry normalizer on every cache-miss fetch and never
/// mutated afterwards; the next fetch supersedes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpaceWeatherReading {
    /// When this reading was produced (UTC).
    pub timestamp: DateTime<Utc>,
    /// Solar wind bulk speed (km/s).
    pub speed: f64,
    /// Proton density (p/cm3).
    pub density: f64,
    /// Ion temperature (K).
    pub temperature: f64,
    /// IMF x component (nT, GSM).
    pub bx: f64,
    /// IMF y component (nT, GSM).
    pub by: f64,
    /// IMF z component (nT, GSM). Negative = southward = geoeffective.
    pub bz: f64,
    /// Total IMF magnitude (nT). Synthesized from components when absent.
    pub bt: f64,
    /// Solar wind dynamic pressure (nPa), rounded to 2 decimals.
    pub dynamic_pressure: f64,
    /// IMF clock angle in degrees, [0, 360). 180 is purely southward.
    pub clock_angle: f64,
    /// Minutes of the last 60 with bz < -3 nT.
    pub southward_duration_min: u32,
    /// Severe-storm similarity score, 0-99.
    pub similarity_score: u8,
    /// Official storm-scale table, when available.
    pub storm_scale: StormScale,
    /// Live feed or degraded fallback.
    pub provenance: Provenance,
}

// ============================================================================
// Darkness
// ============================================================================

/// Sky darkness classification by solar altitude.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DarknessLevel {
    /// Sun below -18 deg (astronomical night).
    Night,
    /// Sun between -18 and -12 deg.
    NauticalTwilight,
    /// Sun between -12 and -6 deg.
    CivilTwilight,
    /// Sun between -6 and 0 deg. Too bright for aurora.
    Horizon,
    /// Sun above the horizon.
    Day,
}

impl std::fmt::Display for DarknessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DarknessLevel::Night => write!(f, "night"),
            DarknessLevel::NauticalTwilight => write!(f, "nautical twilight"),
            DarknessLevel::CivilTwilight => write!(f, "civil twilight"),
            DarknessLevel::Horizon => write!(f, "horizon"),
            DarknessLevel::Day => write!(f, "day"),
        }
    }
}

/// Solar darkness state for a location at an instant.
///
/// Cheap deterministic function of lat/lon/time; computed fresh per decision,
/// never cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DarknessInfo {
    pub solar_altitude_deg: f64,
    pub level: DarknessLevel,
    /// True from civil twilight onward (altitude < -6 deg).
    pub can_view_aurora: bool,
}

// ============================================================================
// Clouds
// ============================================================================

/// Short-term low-cloud trend from the hourly forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CloudTrend {
    Clearing,
    Increasing,
    Stable,
    #[default]
    Unknown,
}

/// Fractional cloud cover by altitude band, percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudConditions {
    pub total: f64,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
    pub trend: CloudTrend,
    pub provenance: Provenance,
}

impl CloudConditions {
    /// Neutral "assume clear" substitute when the cloud collaborator is
    /// unavailable. The decision engine must never block on optional data.
    pub fn assume_clear() -> Self {
        Self {
            total: 0.0,
            low: 0.0,
            mid: 0.0,
            high: 0.0,
            trend: CloudTrend::Unknown,
            provenance: Provenance::Degraded,
        }
    }

    /// Composite sky clarity: `100 - (low*1.0 + mid*0.7 + high*0.3)`,
    /// clamped to >= 0.
    pub fn sky_clarity(&self) -> f64 {
        (100.0 - (self.low + self.mid * 0.7 + self.high * 0.3)).max(0.0)
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Binary verdict. The public contract is strictly GO / NO-GO; marginal
/// conditions are NO-GO with a distinct reason code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Go,
    NoGo,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Go => write!(f, "GO"),
            Verdict::NoGo => write!(f, "NO-GO"),
        }
    }
}

/// Confidence annotation attached to every verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Stable machine-readable code for each decision branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NoTelemetry,
    TooBright,
    ImfNorthward,
    TooFarSouth,
    WeakDrivers,
    LowCloudOcclusion,
    SkyTooMurky,
    Marginal,
    BelowGoThreshold,
    StrongConditions,
    FavorableConditions,
}

/// Result of the decision matrix: is it worth going outside right now?
///
/// Derived, never persisted; recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason_code: ReasonCode,
    /// Human-readable reason. Never empty.
    pub reason: String,
    pub confidence: Confidence,
    /// Weighted contributions that fed the go-score, for transparency.
    pub contributing_factors: Vec<String>,
    /// Accumulated go-score, present only when the rule chain fell through
    /// to scoring.
    pub go_score: Option<u32>,
}

// ============================================================================
// Observer location
// ============================================================================

/// Geographic point, degrees. Positive lat = north, positive lon = east.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

// ============================================================================
// Daily summary
// ============================================================================

/// Min/max/avg over one telemetry channel for a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl ChannelStats {
    /// Compute stats over a non-empty slice. Returns `None` for empty input.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Some(Self {
            min,
            max,
            avg: sum / values.len() as f64,
        })
    }
}

/// Qualitative verdict over the prior day's activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryVerdict {
    Excellent,
    Good,
    Moderate,
    Quiet,
}

impl std::fmt::Display for SummaryVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryVerdict::Excellent => write!(f, "EXCELLENT"),
            SummaryVerdict::Good => write!(f, "GOOD"),
            SummaryVerdict::Moderate => write!(f, "MODERATE"),
            SummaryVerdict::Quiet => write!(f, "QUIET"),
        }
    }
}

/// Retrospective digest of the prior calendar day's telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub speed: ChannelStats,
    pub density: ChannelStats,
    pub bz: ChannelStats,
    pub bt: ChannelStats,
    /// Minutes with bz < -5 nT ("good aurora time").
    pub southward_minutes: u32,
    /// Peak similarity score across every paired plasma/mag sample.
    pub peak_similarity: u8,
    /// Timestamp of the peak sample, when parseable.
    pub peak_timestamp: Option<DateTime<Utc>>,
    pub verdict: SummaryVerdict,
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_stats_empty() {
        assert!(ChannelStats::of(&[]).is_none());
    }

    #[test]
    fn test_channel_stats_basic() {
        let s = ChannelStats::of(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert!((s.avg - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sky_clarity_clamps_at_zero() {
        let clouds = CloudConditions {
            total: 100.0,
            low: 100.0,
            mid: 100.0,
            high: 100.0,
            trend: CloudTrend::Stable,
            provenance: Provenance::Live,
        };
        assert_eq!(clouds.sky_clarity(), 0.0);
    }

    #[test]
    fn test_sky_clarity_clear() {
        assert_eq!(CloudConditions::assume_clear().sky_clarity(), 100.0);
    }

    #[test]
    fn test_verdict_serializes_screaming() {
        let v = serde_json::to_string(&Verdict::NoGo).unwrap();
        assert_eq!(v, "\"NO_GO\"");
    }
}
