//! Cloud-cover and ovation-forecast collaborators
//!
//! Both are optional corroborating evidence. Fetch failures, timeouts, and
//! malformed payloads degrade to neutral defaults ("assume clear" clouds,
//! `None` probability) so the decision engine never blocks on them.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{self, defaults};
use crate::telemetry::TelemetryError;
use crate::types::{CloudConditions, CloudTrend, Provenance};

/// Low-cloud change (percentage points over the next 3 h) considered a trend.
const TREND_DELTA_PCT: f64 = 10.0;

// ============================================================================
// Cloud cover
// ============================================================================

/// Client for the cloud-cover forecast collaborator (Open-Meteo shape).
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: reqwest::Client,
}

impl CloudClient {
    pub fn new() -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::SECONDARY_TIMEOUT_SECS))
            .user_agent(concat!("aurora-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch cloud cover for a location. Fail-open to "assume clear".
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> CloudConditions {
        match self.try_fetch(latitude, longitude).await {
            Ok(conditions) => conditions,
            Err(e) => {
                warn!(error = %e, "Cloud collaborator unavailable, assuming clear sky");
                CloudConditions::assume_clear()
            }
        }
    }

    async fn try_fetch(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CloudConditions, TelemetryError> {
        let base = &config::get().endpoints.clouds;
        let url = format!(
            "{base}?latitude={latitude:.4}&longitude={longitude:.4}\
             &current=cloud_cover,cloud_cover_low,cloud_cover_mid,cloud_cover_high\
             &hourly=cloud_cover_low&forecast_hours=4"
        );
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(TelemetryError::Upstream(format!(
                "cloud forecast returned HTTP {}",
                resp.status()
            )));
        }
        let body: Value = resp.json().await?;
        parse_cloud_body(&body)
            .ok_or_else(|| TelemetryError::Malformed("cloud forecast missing fields".to_string()))
    }
}

fn parse_cloud_body(body: &Value) -> Option<CloudConditions> {
    let current = body.get("current")?;
    let low = current.get("cloud_cover_low")?.as_f64()?;
    let conditions = CloudConditions {
        total: current.get("cloud_cover")?.as_f64()?,
        low,
        mid: current.get("cloud_cover_mid")?.as_f64()?,
        high: current.get("cloud_cover_high")?.as_f64()?,
        trend: hourly_low(body)
            .map_or(CloudTrend::Unknown, |hourly| trend_from_hourly(low, &hourly)),
        provenance: Provenance::Live,
    };
    debug!(
        total = conditions.total,
        low = conditions.low,
        trend = ?conditions.trend,
        "Fetched cloud conditions"
    );
    Some(conditions)
}

fn hourly_low(body: &Value) -> Option<Vec<f64>> {
    body.get("hourly")?
        .get("cloud_cover_low")?
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect()
}

/// Classify the low-cloud trend from the forecast hours after the current
/// one. Less than three forecast hours is not enough signal.
pub fn trend_from_hourly(current_low: f64, hourly_low: &[f64]) -> CloudTrend {
    let upcoming: Vec<f64> = hourly_low.iter().skip(1).take(3).copied().collect();
    if upcoming.len() < 3 {
        return CloudTrend::Unknown;
    }
    let mean = upcoming.iter().sum::<f64>() / upcoming.len() as f64;
    let delta = mean - current_low;
    if delta <= -TREND_DELTA_PCT {
        CloudTrend::Clearing
    } else if delta >= TREND_DELTA_PCT {
        CloudTrend::Increasing
    } else {
        CloudTrend::Stable
    }
}

// ============================================================================
// Ovation forecast
// ============================================================================

/// Client for the supplementary probability-of-visibility grid.
#[derive(Debug, Clone)]
pub struct OvationClient {
    client: reqwest::Client,
}

impl OvationClient {
    pub fn new() -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::SECONDARY_TIMEOUT_SECS))
            .user_agent(concat!("aurora-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Probability of visible aurora at the nearest grid point, percent.
    /// `None` when the forecast is unavailable — it is corroborating
    /// evidence only, never required.
    pub async fn fetch_probability(&self, latitude: f64, longitude: f64) -> Option<f64> {
        match self.try_fetch(latitude, longitude).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Ovation forecast unavailable");
                None
            }
        }
    }

    async fn try_fetch(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<f64>, TelemetryError> {
        let url = &config::get().endpoints.ovation;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(TelemetryError::Upstream(format!(
                "ovation returned HTTP {}",
                resp.status()
            )));
        }
        let body: Value = resp.json().await?;
        Ok(probability_at(&body, latitude, longitude))
    }
}

/// Nearest-grid-point lookup in the `[lon_east, lat, probability]`
/// coordinate list (1-degree grid, longitudes 0-359 east).
pub fn probability_at(body: &Value, latitude: f64, longitude: f64) -> Option<f64> {
    let coordinates = body.get("coordinates")?.as_array()?;
    let target_lat = latitude.round();
    let target_lon = ((longitude.round() as i64 % 360) + 360) % 360;

    coordinates.iter().find_map(|entry| {
        let point = entry.as_array()?;
        let lon = point.first()?.as_f64()?;
        let lat = point.get(1)?.as_f64()?;
        if lon as i64 == target_lon && lat == target_lat {
            point.get(2)?.as_f64()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trend_clearing() {
        assert_eq!(
            trend_from_hourly(60.0, &[60.0, 45.0, 40.0, 35.0]),
            CloudTrend::Clearing
        );
    }

    #[test]
    fn test_trend_increasing() {
        assert_eq!(
            trend_from_hourly(10.0, &[10.0, 25.0, 30.0, 40.0]),
            CloudTrend::Increasing
        );
    }

    #[test]
    fn test_trend_stable() {
        assert_eq!(
            trend_from_hourly(30.0, &[30.0, 32.0, 28.0, 33.0]),
            CloudTrend::Stable
        );
    }

    #[test]
    fn test_trend_unknown_on_short_forecast() {
        assert_eq!(trend_from_hourly(30.0, &[30.0, 20.0]), CloudTrend::Unknown);
    }

    #[test]
    fn test_parse_cloud_body() {
        let body = json!({
            "current": {
                "cloud_cover": 55.0,
                "cloud_cover_low": 40.0,
                "cloud_cover_mid": 20.0,
                "cloud_cover_high": 10.0
            },
            "hourly": { "cloud_cover_low": [40.0, 20.0, 15.0, 10.0] }
        });
        let c = parse_cloud_body(&body).unwrap();
        assert_eq!(c.low, 40.0);
        assert_eq!(c.trend, CloudTrend::Clearing);
        assert_eq!(c.provenance, Provenance::Live);
    }

    #[test]
    fn test_parse_cloud_body_missing_fields() {
        assert!(parse_cloud_body(&json!({ "current": {} })).is_none());
    }

    #[test]
    fn test_ovation_nearest_point() {
        let body = json!({
            "coordinates": [
                [212, 64, 3.0],
                [213, 65, 42.0],
                [214, 65, 17.0]
            ]
        });
        // -147.2 east-normalized rounds to 213.
        assert_eq!(probability_at(&body, 64.8, -147.2), Some(42.0));
    }

    #[test]
    fn test_ovation_missing_point() {
        let body = json!({ "coordinates": [[0, 0, 1.0]] });
        assert_eq!(probability_at(&body, 64.8, -147.2), None);
    }
}
