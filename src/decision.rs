//! GO/NO-GO decision matrix
//!
//! A short-circuit rule chain evaluated in fixed order — first match wins —
//! followed by a weighted go-score for readings that clear every veto. The
//! output is strictly binary: marginal conditions are a NO-GO with their own
//! reason code, never a third state.
//!
//! Every branch emits a specific, non-empty human reason; "no reason" is not
//! an allowed output of this module.

use crate::sky::visibility;
use crate::types::{
    CloudConditions, Confidence, DarknessInfo, Decision, Location, ReasonCode,
    SpaceWeatherReading, Verdict,
};

/// Low-layer cloud cover above this occludes any aurora (percent).
const LOW_CLOUD_VETO_PCT: f64 = 50.0;

/// Composite sky clarity below this is not worth going out for.
const CLARITY_VETO: f64 = 40.0;

/// Dynamic pressure above this counts as elevated (nPa).
const ELEVATED_PRESSURE_NPA: f64 = 3.0;

/// Everything the decision matrix looks at for one verdict.
#[derive(Debug, Clone)]
pub struct DecisionInputs<'a> {
    pub observer: Location,
    pub reading: &'a SpaceWeatherReading,
    pub darkness: &'a DarknessInfo,
    pub hours_until_dark: Option<f64>,
    pub clouds: &'a CloudConditions,
    /// Supplementary probability-of-visibility forecast, percent.
    pub ovation_probability: Option<f64>,
}

/// Evaluate the decision matrix for one observer and instant.
pub fn evaluate(inputs: &DecisionInputs) -> Decision {
    let reading = inputs.reading;

    // Rule 1: no live telemetry.
    if reading.provenance.is_degraded() {
        return no_go(
            ReasonCode::NoTelemetry,
            Confidence::High,
            "Solar wind telemetry is unavailable; the pipeline is running on a quiet \
             substitute reading. No basis for a GO."
                .to_string(),
        );
    }

    // Rule 2: too bright to see anything.
    if !inputs.darkness.can_view_aurora {
        let dark_note = match inputs.hours_until_dark {
            Some(h) => format!("dark enough in about {h:.1} h"),
            None => "the sky will not get dark enough within the next 18 h".to_string(),
        };
        let activity_note = if reading.similarity_score >= 40 {
            format!(
                "space weather is active (similarity {}) — worth re-checking after sunset",
                reading.similarity_score
            )
        } else {
            format!("space weather is quiet (similarity {})", reading.similarity_score)
        };
        return no_go(
            ReasonCode::TooBright,
            Confidence::High,
            format!(
                "Sky is too bright ({}, sun at {:.1}°); {dark_note}. Meanwhile {activity_note}.",
                inputs.darkness.level, inputs.darkness.solar_altitude_deg
            ),
        );
    }

    // Rule 3: northward IMF, magnetosphere closed.
    if reading.bz >= 0.0 {
        return no_go(
            ReasonCode::ImfNorthward,
            Confidence::High,
            format!(
                "IMF is northward (bz +{:.1} nT); the magnetosphere is closed and \
                 aurora is not being driven.",
                reading.bz
            ),
        );
    }

    // Rule 4: aurora sits poleward of the observer.
    let visible_lat = visibility::visible_latitude(reading);
    let observer_lat = inputs.observer.latitude.abs();
    let margin = observer_lat - visible_lat;
    if margin < 0.0 {
        return no_go(
            ReasonCode::TooFarSouth,
            Confidence::High,
            format!(
                "Current conditions reach down to about {visible_lat:.0}° |latitude|; \
                 at {observer_lat:.1}° you are {:.1}° short.",
                -margin
            ),
        );
    }

    // Rule 5: neither the IMF nor the pressure is doing anything.
    if reading.bz > -5.0 && reading.dynamic_pressure <= ELEVATED_PRESSURE_NPA {
        return no_go(
            ReasonCode::WeakDrivers,
            Confidence::Medium,
            format!(
                "Drivers are weak: bz {:.1} nT is barely southward and dynamic pressure \
                 {:.2} nPa is not elevated.",
                reading.bz, reading.dynamic_pressure
            ),
        );
    }

    // Rule 6: active aurora, occluded sky.
    if inputs.clouds.low > LOW_CLOUD_VETO_PCT {
        return no_go(
            ReasonCode::LowCloudOcclusion,
            Confidence::Medium,
            format!(
                "Low cloud is at {:.0}% — aurora may be active above the deck, but you \
                 will not see it (trend: {:?}).",
                inputs.clouds.low, inputs.clouds.trend
            ),
        );
    }

    // Rule 7: composite clarity too poor.
    let clarity = inputs.clouds.sky_clarity();
    if clarity < CLARITY_VETO {
        return no_go(
            ReasonCode::SkyTooMurky,
            Confidence::Medium,
            format!(
                "Composite sky clarity is {clarity:.0}% (low {:.0}/mid {:.0}/high {:.0}); \
                 too murky for a sighting.",
                inputs.clouds.low, inputs.clouds.mid, inputs.clouds.high
            ),
        );
    }

    // All vetoes cleared: accumulate the go-score.
    let (score, factors) = go_score(inputs, margin, clarity);

    if score >= 55 && clarity >= 60.0 && margin >= 5.0 {
        return Decision {
            verdict: Verdict::Go,
            reason_code: ReasonCode::StrongConditions,
            reason: format!(
                "Strong storm signatures (score {score}): bz {:.1} nT, {:.0} km/s wind, \
                 {clarity:.0}% clear sky, {margin:.1}° of latitude margin. Go now.",
                reading.bz, reading.speed
            ),
            confidence: Confidence::High,
            contributing_factors: factors,
            go_score: Some(score),
        };
    }
    if score >= 45 && clarity >= 50.0 && margin >= 0.0 {
        return Decision {
            verdict: Verdict::Go,
            reason_code: ReasonCode::FavorableConditions,
            reason: format!(
                "Conditions lean favorable (score {score}): bz {:.1} nT with {clarity:.0}% \
                 clear sky. Worth stepping outside.",
                reading.bz
            ),
            confidence: Confidence::Medium,
            contributing_factors: factors,
            go_score: Some(score),
        };
    }
    if score >= 35 && clarity >= 50.0 && margin >= -3.0 {
        return Decision {
            verdict: Verdict::NoGo,
            reason_code: ReasonCode::Marginal,
            reason: format!(
                "Marginal conditions (score {score}): something may be visible low on the \
                 horizon, but probably not worth the trip."
            ),
            confidence: Confidence::Low,
            contributing_factors: factors,
            go_score: Some(score),
        };
    }
    Decision {
        verdict: Verdict::NoGo,
        reason_code: ReasonCode::BelowGoThreshold,
        reason: format!(
            "Conditions do not add up (score {score}, need 45): bz {:.1} nT, similarity {}.",
            reading.bz, reading.similarity_score
        ),
        confidence: Confidence::Medium,
        contributing_factors: factors,
        go_score: Some(score),
    }
}

fn no_go(reason_code: ReasonCode, confidence: Confidence, reason: String) -> Decision {
    Decision {
        verdict: Verdict::NoGo,
        reason_code,
        reason,
        confidence,
        contributing_factors: Vec::new(),
        go_score: None,
    }
}

// ============================================================================
// Go-score accumulation
// ============================================================================

/// Weighted contributions toward a GO, with a trace of what counted.
fn go_score(inputs: &DecisionInputs, margin: f64, clarity: f64) -> (u32, Vec<String>) {
    let reading = inputs.reading;
    let mut score: u32 = 0;
    let mut factors = Vec::new();
    let mut add = |points: u32, label: String| {
        score += points;
        factors.push(format!("+{points} {label}"));
    };

    // Bz strength tiers.
    let bz_points = if reading.bz <= -25.0 {
        35
    } else if reading.bz <= -18.0 {
        28
    } else if reading.bz <= -12.0 {
        20
    } else if reading.bz <= -8.0 {
        15
    } else {
        12
    };
    add(bz_points, format!("southward bz {:.1} nT", reading.bz));

    // Sustained southward duration.
    if reading.southward_duration_min >= 40 {
        add(12, format!("{} min sustained southward", reading.southward_duration_min));
    } else if reading.southward_duration_min >= 20 {
        add(6, format!("{} min sustained southward", reading.southward_duration_min));
    }

    // Wind speed tiers.
    if reading.speed >= 700.0 {
        add(12, format!("{:.0} km/s wind", reading.speed));
    } else if reading.speed >= 550.0 {
        add(9, format!("{:.0} km/s wind", reading.speed));
    } else if reading.speed >= 450.0 {
        add(6, format!("{:.0} km/s wind", reading.speed));
    }

    // Elevated dynamic pressure.
    if reading.dynamic_pressure > 5.0 {
        add(6, format!("{:.1} nPa dynamic pressure", reading.dynamic_pressure));
    }

    // Density tiers.
    if reading.density >= 20.0 {
        add(8, format!("{:.1} p/cm3 density", reading.density));
    } else if reading.density >= 10.0 {
        add(4, format!("{:.1} p/cm3 density", reading.density));
    }

    // Clock angle near purely southward.
    if (135.0..=225.0).contains(&reading.clock_angle) {
        add(4, format!("clock angle {:.0}°", reading.clock_angle));
    }

    // Overall similarity.
    if reading.similarity_score >= 60 {
        add(8, format!("similarity {}", reading.similarity_score));
    } else if reading.similarity_score >= 40 {
        add(4, format!("similarity {}", reading.similarity_score));
    }

    // Latitude margin over the visibility estimate.
    if margin >= 10.0 {
        add(10, format!("{margin:.1}° latitude margin"));
    } else if margin >= 5.0 {
        add(5, format!("{margin:.1}° latitude margin"));
    }

    // Sky clarity.
    if clarity >= 80.0 {
        add(8, format!("{clarity:.0}% clear sky"));
    } else if clarity >= 60.0 {
        add(4, format!("{clarity:.0}% clear sky"));
    }

    // Supplementary ovation forecast, corroborating only.
    if let Some(probability) = inputs.ovation_probability {
        if probability >= 50.0 {
            add(8, format!("ovation probability {probability:.0}%"));
        } else if probability >= 25.0 {
            add(4, format!("ovation probability {probability:.0}%"));
        }
    }

    (score, factors)
}
