//! Severe-storm similarity scoring
//!
//! Compares a reading against a fixed severe-storm baseline and produces a
//! 0-99 similarity score. All math is pure and deterministic — feeding a
//! reading's own fields back through reproduces its stored score.

// ============================================================================
// Baseline
// ============================================================================

/// Fixed reference constants for the most severe reference event.
/// Read-only for the lifetime of the process.
pub mod baseline {
    pub const SPEED_KM_S: f64 = 750.0;
    pub const DENSITY_P_CM3: f64 = 25.0;
    pub const BZ_NT: f64 = -30.0;
    pub const BT_NT: f64 = 40.0;
    pub const PRESSURE_NPA: f64 = 15.0;
    pub const TEMPERATURE_K: f64 = 500_000.0;
}

// ============================================================================
// Component scores
// ============================================================================

/// Per-quantity scores, each capped at 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub bz: f64,
    pub speed: f64,
    pub density: f64,
    pub bt: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// `min(100, round(obs / |base| * 100))` for one quantity.
fn component(observed: f64, base: f64) -> f64 {
    (observed / base.abs() * 100.0).round().min(100.0)
}

/// Score each quantity against the baseline.
///
/// Bz and temperature are compared by magnitude; the others are taken
/// directly (they are physically non-negative).
pub fn component_scores(
    speed: f64,
    density: f64,
    bz: f64,
    bt: f64,
    pressure: f64,
    temperature: f64,
) -> ComponentScores {
    ComponentScores {
        bz: component(bz.abs(), baseline::BZ_NT),
        speed: component(speed, baseline::SPEED_KM_S),
        density: component(density, baseline::DENSITY_P_CM3),
        bt: component(bt, baseline::BT_NT),
        pressure: component(pressure, baseline::PRESSURE_NPA),
        temperature: component(temperature.abs(), baseline::TEMPERATURE_K),
    }
}

/// Weighted sum of the component scores, before bonuses and clamping.
///
/// Bz dominates at 0.40 — a southward IMF is the primary aurora driver.
pub fn weighted_sum(c: &ComponentScores) -> f64 {
    0.40 * c.bz + 0.20 * c.speed + 0.15 * c.density + 0.10 * c.bt + 0.10 * c.pressure
        + 0.05 * c.temperature
}

// ============================================================================
// Similarity
// ============================================================================

/// Similarity score for a single instant, without the sustained-southward
/// bonus (which needs a rolling window). Used by the daily summary when
/// rescoring historical sample pairs.
pub fn score_instant(
    speed: f64,
    density: f64,
    bz: f64,
    bt: f64,
    pressure: f64,
    temperature: f64,
) -> u8 {
    finish(
        weighted_sum(&component_scores(speed, density, bz, bt, pressure, temperature)).round(),
        bz,
        speed,
        None,
    )
}

/// Full similarity score including the sustained-southward bonus.
pub fn score_reading(
    speed: f64,
    density: f64,
    bz: f64,
    bt: f64,
    pressure: f64,
    temperature: f64,
    southward_duration_min: u32,
) -> u8 {
    finish(
        weighted_sum(&component_scores(speed, density, bz, bt, pressure, temperature)).round(),
        bz,
        speed,
        Some(southward_duration_min),
    )
}

/// Apply bonuses and the 99 cap.
///
/// The score never reaches 100 — saturation would imply certainty the
/// upstream data cannot support.
fn finish(weighted: f64, bz: f64, speed: f64, southward_duration_min: Option<u32>) -> u8 {
    let mut score = weighted;
    if let Some(duration) = southward_duration_min {
        if duration >= 20 && bz < -5.0 {
            score += 10.0;
        }
    }
    if bz < -15.0 {
        score += 5.0;
    }
    if speed > 600.0 {
        score += 5.0;
    }
    score.clamp(0.0, 99.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_reading_weighs_exactly_100_before_bonuses() {
        let c = component_scores(
            baseline::SPEED_KM_S,
            baseline::DENSITY_P_CM3,
            baseline::BZ_NT,
            baseline::BT_NT,
            baseline::PRESSURE_NPA,
            baseline::TEMPERATURE_K,
        );
        assert!((weighted_sum(&c) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_reading_clamps_to_99() {
        let score = score_reading(
            baseline::SPEED_KM_S,
            baseline::DENSITY_P_CM3,
            baseline::BZ_NT,
            baseline::BT_NT,
            baseline::PRESSURE_NPA,
            baseline::TEMPERATURE_K,
            60,
        );
        assert_eq!(score, 99);
    }

    #[test]
    fn test_quiet_conditions_score_low() {
        let score = score_reading(350.0, 3.0, 1.5, 4.0, 0.7, 50_000.0, 0);
        assert!(score < 25, "quiet score was {score}");
    }

    #[test]
    fn test_components_cap_at_100() {
        let c = component_scores(3000.0, 500.0, -120.0, 300.0, 90.0, 9e6);
        assert_eq!(c.speed, 100.0);
        assert_eq!(c.bz, 100.0);
        assert_eq!(c.density, 100.0);
        assert_eq!(c.bt, 100.0);
        assert_eq!(c.pressure, 100.0);
        assert_eq!(c.temperature, 100.0);
    }

    #[test]
    fn test_score_always_in_range_for_extreme_inputs() {
        for &(speed, density, bz) in &[
            (0.0, 0.0, 0.0),
            (5000.0, 1000.0, -500.0),
            (750.0, 25.0, 30.0),
            (1.0, 0.01, -0.01),
        ] {
            let s = score_reading(speed, density, bz, 10.0, 2.0, 100_000.0, 60);
            assert!(s <= 99);
        }
    }

    #[test]
    fn test_duration_bonus_requires_both_conditions() {
        // Long duration but bz barely southward: no +10.
        let without = score_reading(400.0, 5.0, -4.0, 8.0, 1.3, 100_000.0, 0);
        let with = score_reading(400.0, 5.0, -4.0, 8.0, 1.3, 100_000.0, 45);
        assert_eq!(without, with);

        // Both conditions met: +10.
        let without = score_reading(400.0, 5.0, -8.0, 10.0, 1.3, 100_000.0, 0);
        let with = score_reading(400.0, 5.0, -8.0, 10.0, 1.3, 100_000.0, 45);
        assert_eq!(u32::from(with), u32::from(without) + 10);
    }

    #[test]
    fn test_instant_score_matches_reading_score_sans_duration() {
        let instant = score_instant(550.0, 12.0, -18.0, 22.0, 8.4, 300_000.0);
        let reading = score_reading(550.0, 12.0, -18.0, 22.0, 8.4, 300_000.0, 0);
        assert_eq!(instant, reading);
    }
}
