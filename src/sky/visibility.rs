//! Latitude-based visibility estimation
//!
//! Maps current conditions to the minimum |latitude| at which aurora should
//! be visible. An official G-scale observation wins when present; otherwise a
//! bz/speed ladder applies. Deliberately conservative — it prefers a higher
//! latitude threshold (fewer false GOs) over an optimistic one.

use crate::types::SpaceWeatherReading;

/// Minimum |latitude| (degrees) at which the current conditions should
/// produce visible aurora.
pub fn visible_latitude(reading: &SpaceWeatherReading) -> f64 {
    if let Some(lat) = reading.storm_scale.observed.and_then(latitude_for_scale) {
        return lat;
    }
    ladder(reading.bz, reading.speed)
}

/// Official G-scale to visibility latitude. G0 defers to the ladder.
pub fn latitude_for_scale(g: u8) -> Option<f64> {
    match g {
        5 => Some(30.0),
        4 => Some(35.0),
        3 => Some(45.0),
        2 => Some(50.0),
        1 => Some(55.0),
        _ => None,
    }
}

/// Fallback bz/speed-conditioned ladder.
fn ladder(bz: f64, speed: f64) -> f64 {
    if bz < -25.0 && speed > 600.0 {
        35.0
    } else if bz < -20.0 && speed > 500.0 {
        40.0
    } else if bz < -15.0 && speed > 450.0 {
        45.0
    } else if bz < -10.0 && speed > 400.0 {
        50.0
    } else if bz < -8.0 {
        55.0
    } else if bz < -5.0 {
        58.0
    } else if bz < -3.0 {
        62.0
    } else {
        67.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, StormScale};
    use chrono::Utc;

    fn reading(bz: f64, speed: f64, observed_scale: Option<u8>) -> SpaceWeatherReading {
        SpaceWeatherReading {
            timestamp: Utc::now(),
            speed,
            density: 5.0,
            temperature: 100_000.0,
            bx: 1.0,
            by: 1.0,
            bz,
            bt: bz.abs() + 2.0,
            dynamic_pressure: 1.0,
            clock_angle: 180.0,
            southward_duration_min: 0,
            similarity_score: 0,
            storm_scale: StormScale {
                observed: observed_scale,
                predicted: None,
            },
            provenance: Provenance::Live,
        }
    }

    #[test]
    fn test_official_scale_takes_priority() {
        // Quiet ladder inputs but a G4 observation: scale wins.
        let r = reading(-1.0, 350.0, Some(4));
        assert_eq!(visible_latitude(&r), 35.0);
    }

    #[test]
    fn test_g0_falls_back_to_ladder() {
        let r = reading(-9.0, 380.0, Some(0));
        assert_eq!(visible_latitude(&r), 55.0);
    }

    #[test]
    fn test_ladder_extremes() {
        assert_eq!(visible_latitude(&reading(-30.0, 700.0, None)), 35.0);
        assert_eq!(visible_latitude(&reading(0.0, 400.0, None)), 67.0);
    }

    #[test]
    fn test_speed_condition_gates_strong_tiers() {
        // Strong bz but slow wind: skips the coupled tiers down to the
        // bz-only rungs.
        assert_eq!(visible_latitude(&reading(-26.0, 300.0, None)), 55.0);
    }

    #[test]
    fn test_monotonic_in_bz() {
        // More negative bz never raises the required latitude, all else equal.
        for &speed in &[350.0, 450.0, 550.0, 650.0] {
            let mut prev = f64::NEG_INFINITY;
            let mut bz = -35.0;
            while bz <= 2.0 {
                let lat = visible_latitude(&reading(bz, speed, None));
                assert!(
                    lat >= prev,
                    "latitude regressed at bz={bz} speed={speed}: {lat} < {prev}"
                );
                prev = lat;
                bz += 0.25;
            }
        }
    }
}
