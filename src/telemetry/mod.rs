//! Telemetry Module
//!
//! Turns raw interplanetary-magnetic-field and solar-wind products into a
//! normalized [`crate::types::SpaceWeatherReading`]:
//!
//! - `source`: upstream fetch (plasma + magnetometer + storm-scale fan-out)
//! - `normalizer`: row validation and derived physical quantities
//! - `scorer`: severe-storm similarity score (0-99)
//!
//! Failure philosophy is fail-open: a dead or malformed feed produces a
//! degraded quiet reading, never an error in the decision path.

pub mod normalizer;
pub mod scorer;
pub mod source;

pub use normalizer::normalize;
pub use source::{RawTelemetry, TelemetrySource};

/// Telemetry-side error taxonomy.
///
/// `Upstream` covers network/timeout/non-2xx; `NoValidData` is the
/// post-filtering empty set, which callers treat the same way.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("no valid {0} rows in the telemetry window")]
    NoValidData(&'static str),
    #[error("malformed telemetry payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        TelemetryError::Upstream(err.to_string())
    }
}
