//! Telemetry normalization
//!
//! Extracts the latest valid plasma/magnetometer readings from the raw row
//! sets and computes the derived physical quantities:
//!
//! - dynamic pressure `1.6726e-6 * density * speed^2` (nPa, 2 dp)
//! - IMF clock angle `(atan2(by, bz) + 360) mod 360` (degrees)
//! - sustained-southward minutes over the trailing hour
//!
//! A malformed or empty feed never propagates: the caller gets a degraded
//! quiet reading tagged `Provenance::Degraded` instead.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::source::{parse_storm_scale, RawTelemetry};
use super::{scorer, TelemetryError};
use crate::config::defaults;
use crate::types::{Provenance, SpaceWeatherReading, StormScale};

// Product column layout (after the header row).
// Plasma: [time_tag, density, speed, temperature]
pub(crate) const PLASMA_DENSITY: usize = 1;
pub(crate) const PLASMA_SPEED: usize = 2;
pub(crate) const PLASMA_TEMPERATURE: usize = 3;
// Magnetometer: [time_tag, bx_gsm, by_gsm, bz_gsm, lon_gsm, lat_gsm, bt]
pub(crate) const MAG_BX: usize = 1;
pub(crate) const MAG_BY: usize = 2;
pub(crate) const MAG_BZ: usize = 3;
pub(crate) const MAG_BT: usize = 6;

/// Normalize a raw fetch into a current-moment reading.
///
/// Fail-open: any processing error yields a degraded substitute so the
/// decision pipeline is never blocked by a bad feed.
pub fn normalize(raw: &RawTelemetry, now: DateTime<Utc>) -> SpaceWeatherReading {
    match try_normalize(raw, now) {
        Ok(reading) => reading,
        Err(e) => {
            warn!(error = %e, "Telemetry normalization failed, substituting degraded reading");
            degraded_reading(now)
        }
    }
}

fn try_normalize(
    raw: &RawTelemetry,
    now: DateTime<Utc>,
) -> Result<SpaceWeatherReading, TelemetryError> {
    let plasma = latest_valid_row(
        &raw.plasma,
        &[PLASMA_DENSITY, PLASMA_SPEED],
        "plasma",
    )?;
    let mag = latest_valid_row(
        &raw.magnetometer,
        &[MAG_BX, MAG_BY, MAG_BZ],
        "magnetometer",
    )?;

    // Post-filtering, missing secondary fields default to 0 (bt synthesizes).
    let density = field(plasma, PLASMA_DENSITY).unwrap_or(0.0);
    let speed = field(plasma, PLASMA_SPEED).unwrap_or(0.0);
    let temperature = field(plasma, PLASMA_TEMPERATURE).unwrap_or(0.0);
    let bx = field(mag, MAG_BX).unwrap_or(0.0);
    let by = field(mag, MAG_BY).unwrap_or(0.0);
    let bz = field(mag, MAG_BZ).unwrap_or(0.0);
    let bt = field(mag, MAG_BT);

    let southward_duration_min = southward_minutes(&raw.magnetometer);
    let storm_scale = parse_storm_scale(raw.scales.as_ref());

    Ok(assemble(
        now,
        speed,
        density,
        temperature,
        bx,
        by,
        bz,
        bt,
        southward_duration_min,
        storm_scale,
        Provenance::Live,
    ))
}

/// Fixed quiet substitute for a dead feed. Northward bz guarantees the
/// decision engine lands on NO-GO rather than inventing a storm.
pub fn degraded_reading(now: DateTime<Utc>) -> SpaceWeatherReading {
    assemble(
        now,
        400.0,
        5.0,
        100_000.0,
        2.0,
        2.0,
        1.0,
        None,
        0,
        StormScale::default(),
        Provenance::Degraded,
    )
}

/// Compute derived quantities and the similarity score from validated inputs.
#[allow(clippy::too_many_arguments)]
fn assemble(
    timestamp: DateTime<Utc>,
    speed: f64,
    density: f64,
    temperature: f64,
    bx: f64,
    by: f64,
    bz: f64,
    bt: Option<f64>,
    southward_duration_min: u32,
    storm_scale: StormScale,
    provenance: Provenance,
) -> SpaceWeatherReading {
    let bt = bt.unwrap_or_else(|| (bx * bx + by * by + bz * bz).sqrt());
    let dynamic_pressure = round2(1.6726e-6 * density * speed * speed);
    let clock_angle = (by.atan2(bz).to_degrees() + 360.0) % 360.0;
    let similarity_score = scorer::score_reading(
        speed,
        density,
        bz,
        bt,
        dynamic_pressure,
        temperature,
        southward_duration_min,
    );

    SpaceWeatherReading {
        timestamp,
        speed,
        density,
        temperature,
        bx,
        by,
        bz,
        bt,
        dynamic_pressure,
        clock_angle,
        southward_duration_min,
        similarity_score,
        storm_scale,
        provenance,
    }
}

// ============================================================================
// Row extraction
// ============================================================================

/// Rows after the header line.
pub(crate) fn data_rows(rows: &[Value]) -> &[Value] {
    if rows.is_empty() {
        rows
    } else {
        &rows[1..]
    }
}

/// Scan the trailing lookback window for the most recent row whose required
/// fields all parse as finite numbers.
fn latest_valid_row<'a>(
    rows: &'a [Value],
    required: &[usize],
    stream: &'static str,
) -> Result<&'a Value, TelemetryError> {
    let data = data_rows(rows);
    let window_start = data.len().saturating_sub(defaults::ROW_LOOKBACK);
    data[window_start..]
        .iter()
        .rev()
        .find(|row| required.iter().all(|&idx| field(row, idx).is_some()))
        .ok_or(TelemetryError::NoValidData(stream))
}

/// Extract a numeric field. Products encode numbers as strings; missing,
/// null, or non-finite values are treated as absent, not zero.
pub(crate) fn field(row: &Value, idx: usize) -> Option<f64> {
    let cell = row.get(idx)?;
    let n = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Count minutes of the trailing hour with bz below the southward threshold.
/// Assumes the one-per-minute magnetometer cadence.
fn southward_minutes(mag_rows: &[Value]) -> u32 {
    let data = data_rows(mag_rows);
    let window_start = data.len().saturating_sub(defaults::SOUTHWARD_WINDOW_MIN);
    data[window_start..]
        .iter()
        .filter(|row| {
            field(row, MAG_BZ).is_some_and(|bz| bz < defaults::SOUTHWARD_BZ_THRESHOLD_NT)
        })
        .count() as u32
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
