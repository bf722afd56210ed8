//! System-wide default constants.
//!
//! Centralises magic numbers used across the pipeline.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Telemetry
// ============================================================================

/// HTTP timeout for primary telemetry fetches (seconds).
pub const TELEMETRY_TIMEOUT_SECS: u64 = 15;

/// HTTP timeout for secondary sources: clouds, ovation forecast (seconds).
pub const SECONDARY_TIMEOUT_SECS: u64 = 10;

/// How many trailing rows of a telemetry product to scan for a valid sample.
pub const ROW_LOOKBACK: usize = 10;

/// Window for the sustained-southward count (minutes, one row per minute).
pub const SOUTHWARD_WINDOW_MIN: usize = 60;

/// Bz below this counts toward the sustained-southward duration (nT).
pub const SOUTHWARD_BZ_THRESHOLD_NT: f64 = -3.0;

// ============================================================================
// Caching
// ============================================================================

/// TTL for the normalized space-weather reading (seconds).
pub const READING_CACHE_TTL_SECS: u64 = 120;

/// TTL for cloud and ovation lookups, per rounded lat/lon key (seconds).
pub const SKY_CACHE_TTL_SECS: u64 = 900;

// ============================================================================
// Alerting
// ============================================================================

/// Minimum minutes between two alert dispatches.
pub const ALERT_COOLDOWN_MIN: u64 = 60;

/// Similarity score at or above which an alert qualifies.
pub const ALERT_MIN_SIMILARITY: u8 = 40;

/// Bz must be below this (nT) for an alert to qualify.
pub const ALERT_MAX_BZ_NT: f64 = -5.0;

// ============================================================================
// Daily summary
// ============================================================================

/// Local-civil hour at which the daily digest goes out.
pub const SUMMARY_HOUR_LOCAL: u32 = 8;

/// Trigger window around the target minute, to tolerate scheduler jitter.
pub const SUMMARY_WINDOW_MIN: i64 = 5;

/// Cadence of the daily-summary check loop (seconds).
pub const SUMMARY_CHECK_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Darkness model
// ============================================================================

/// How far ahead `hours_until_dark` searches before giving up (polar day).
pub const DARKNESS_SEARCH_HORIZON_HOURS: u32 = 18;

/// Solar altitude below which aurora viewing is possible (degrees).
pub const AURORA_DARKNESS_ALTITUDE_DEG: f64 = -6.0;

// ============================================================================
// Upstream endpoints (NOAA SWPC / Open-Meteo)
// ============================================================================

pub const PLASMA_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-5-minute.json";
pub const MAGNETOMETER_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/mag-1-minute.json";
pub const PLASMA_DAILY_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-1-day.json";
pub const MAGNETOMETER_DAILY_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/mag-1-day.json";
pub const SCALES_URL: &str = "https://services.swpc.noaa.gov/products/noaa-scales.json";
pub const OVATION_URL: &str =
    "https://services.swpc.noaa.gov/json/ovation_aurora_latest.json";
pub const CLOUD_URL: &str = "https://api.open-meteo.com/v1/forecast";
