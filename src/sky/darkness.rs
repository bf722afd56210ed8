//! Solar darkness model
//!
//! Approximate spherical-astronomy solar altitude, good to about a degree —
//! plenty for a "is it dark enough for aurora" classification. All functions
//! are pure and deterministic.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::config::defaults;
use crate::types::{DarknessInfo, DarknessLevel};

/// Solar altitude in degrees for a location at an instant.
///
/// Declination uses the `-23.45 * cos(360/365 * (doy + 10))` approximation;
/// the hour angle comes from UTC time and longitude. The sine argument is
/// clamped before the inverse to avoid domain errors at the poles.
pub fn solar_altitude_deg(latitude: f64, longitude: f64, at: DateTime<Utc>) -> f64 {
    let day_of_year = f64::from(at.ordinal());
    let declination_deg = -23.45 * ((360.0 / 365.0) * (day_of_year + 10.0)).to_radians().cos();

    let utc_hours = f64::from(at.hour())
        + f64::from(at.minute()) / 60.0
        + f64::from(at.second()) / 3600.0;
    let solar_noon_utc = 12.0 - longitude / 15.0;
    let hour_angle_deg = (utc_hours - solar_noon_utc) * 15.0;

    let lat = latitude.to_radians();
    let decl = declination_deg.to_radians();
    let hour_angle = hour_angle_deg.to_radians();

    let sin_altitude =
        (lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos()).clamp(-1.0, 1.0);
    sin_altitude.asin().to_degrees()
}

/// Classify a solar altitude into a darkness level.
pub fn classify(altitude_deg: f64) -> DarknessLevel {
    if altitude_deg < -18.0 {
        DarknessLevel::Night
    } else if altitude_deg < -12.0 {
        DarknessLevel::NauticalTwilight
    } else if altitude_deg < -6.0 {
        DarknessLevel::CivilTwilight
    } else if altitude_deg < 0.0 {
        DarknessLevel::Horizon
    } else {
        DarknessLevel::Day
    }
}

/// Full darkness state for a location at an instant.
pub fn darkness_info(latitude: f64, longitude: f64, at: DateTime<Utc>) -> DarknessInfo {
    let solar_altitude_deg = solar_altitude_deg(latitude, longitude, at);
    DarknessInfo {
        solar_altitude_deg,
        level: classify(solar_altitude_deg),
        can_view_aurora: solar_altitude_deg < defaults::AURORA_DARKNESS_ALTITUDE_DEG,
    }
}

/// Hours until the sky next gets dark enough for aurora.
///
/// Steps forward hour-by-hour up to the search horizon, then refines the
/// first dark hour in 15-minute increments. `Some(0.0)` when already dark;
/// `None` when darkness never arrives in the window (polar day).
pub fn hours_until_dark(latitude: f64, longitude: f64, from: DateTime<Utc>) -> Option<f64> {
    let dark_at = |t: DateTime<Utc>| {
        solar_altitude_deg(latitude, longitude, t) < defaults::AURORA_DARKNESS_ALTITUDE_DEG
    };

    if dark_at(from) {
        return Some(0.0);
    }

    for hour in 1..=i64::from(defaults::DARKNESS_SEARCH_HORIZON_HOURS) {
        if dark_at(from + Duration::hours(hour)) {
            // Refine within the preceding hour at 15-minute steps.
            let mut probe = from + Duration::hours(hour - 1);
            let boundary = from + Duration::hours(hour);
            while probe < boundary {
                probe += Duration::minutes(15);
                if dark_at(probe) {
                    break;
                }
            }
            let minutes = (probe - from).num_minutes();
            return Some(minutes as f64 / 60.0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_equator_noon_is_day() {
        // Lat 0, lon 0: local solar noon is 12:00 UTC.
        let info = darkness_info(0.0, 0.0, utc(2026, 3, 21, 12, 0));
        assert_eq!(info.level, DarknessLevel::Day);
        assert!(!info.can_view_aurora);
        assert!(info.solar_altitude_deg > 80.0);
    }

    #[test]
    fn test_equator_midnight_is_dark() {
        let info = darkness_info(0.0, 0.0, utc(2026, 3, 21, 0, 0));
        assert!(info.can_view_aurora);
        assert!(info.solar_altitude_deg < -18.0);
    }

    #[test]
    fn test_longitude_shifts_solar_noon() {
        // Lon -90: solar noon at 18:00 UTC.
        let noonish = solar_altitude_deg(0.0, -90.0, utc(2026, 3, 21, 18, 0));
        assert!(noonish > 80.0);
        let midnightish = solar_altitude_deg(0.0, -90.0, utc(2026, 3, 21, 6, 0));
        assert!(midnightish < -80.0);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify(-18.5), DarknessLevel::Night);
        assert_eq!(classify(-15.0), DarknessLevel::NauticalTwilight);
        assert_eq!(classify(-8.0), DarknessLevel::CivilTwilight);
        assert_eq!(classify(-3.0), DarknessLevel::Horizon);
        assert_eq!(classify(10.0), DarknessLevel::Day);
    }

    #[test]
    fn test_civil_twilight_counts_as_viewable() {
        let info = DarknessInfo {
            solar_altitude_deg: -8.0,
            level: classify(-8.0),
            can_view_aurora: -8.0 < defaults::AURORA_DARKNESS_ALTITUDE_DEG,
        };
        assert!(info.can_view_aurora);
    }

    #[test]
    fn test_hours_until_dark_zero_when_already_dark() {
        assert_eq!(hours_until_dark(0.0, 0.0, utc(2026, 3, 21, 0, 0)), Some(0.0));
    }

    #[test]
    fn test_hours_until_dark_from_equator_noon() {
        let hours = hours_until_dark(0.0, 0.0, utc(2026, 3, 21, 12, 0)).unwrap();
        // Equinox sunset near 18:00 plus twilight; expect roughly 6-8 hours.
        assert!(hours > 5.0 && hours < 9.0, "got {hours}");
    }

    #[test]
    fn test_polar_day_returns_none() {
        // Tromso-ish latitude at midsummer: the sun never gets 6 deg below
        // the horizon inside an 18-hour window.
        assert_eq!(hours_until_dark(69.6, 18.9, utc(2026, 6, 21, 10, 0)), None);
    }
}
