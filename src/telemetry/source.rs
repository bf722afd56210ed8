//! Upstream telemetry fetch
//!
//! Pulls the raw SWPC-style JSON products: solar-wind plasma, magnetometer,
//! and the official storm-scale table. Products are tabular JSON — a header
//! row followed by `[time_tag, v1, v2, ...]` rows of strings/nulls.
//!
//! The plasma + magnetometer + scale fetches fan out concurrently and are
//! joined before normalization. The scale table is corroborating evidence
//! only, so its failure degrades to `None` instead of failing the fetch.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::TelemetryError;
use crate::config::{self, defaults};
use crate::types::StormScale;

/// Raw row sets as fetched, header rows still included.
#[derive(Debug, Clone, Default)]
pub struct RawTelemetry {
    pub plasma: Vec<Value>,
    pub magnetometer: Vec<Value>,
    pub scales: Option<Value>,
}

/// HTTP client for the telemetry feed.
#[derive(Debug, Clone)]
pub struct TelemetrySource {
    client: reqwest::Client,
}

impl TelemetrySource {
    /// Build the client with the primary-telemetry timeout.
    pub fn new() -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::TELEMETRY_TIMEOUT_SECS))
            .user_agent(concat!("aurora-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the current plasma/magnetometer/scale products concurrently.
    pub async fn fetch_current(&self) -> Result<RawTelemetry, TelemetryError> {
        let endpoints = &config::get().endpoints;
        let (plasma, magnetometer, scales) = tokio::join!(
            self.fetch_rows(&endpoints.plasma),
            self.fetch_rows(&endpoints.magnetometer),
            self.fetch_value(&endpoints.scales),
        );

        let scales = match scales {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Storm-scale table unavailable, continuing without it");
                None
            }
        };

        Ok(RawTelemetry {
            plasma: plasma?,
            magnetometer: magnetometer?,
            scales,
        })
    }

    /// Fetch the 1-day history products for the daily summary.
    pub async fn fetch_prior_day(&self) -> Result<RawTelemetry, TelemetryError> {
        let endpoints = &config::get().endpoints;
        let (plasma, magnetometer) = tokio::try_join!(
            self.fetch_rows(&endpoints.plasma_daily),
            self.fetch_rows(&endpoints.magnetometer_daily),
        )?;
        Ok(RawTelemetry {
            plasma,
            magnetometer,
            scales: None,
        })
    }

    /// GET a product and require a top-level JSON array of rows.
    async fn fetch_rows(&self, url: &str) -> Result<Vec<Value>, TelemetryError> {
        let value = self.fetch_value(url).await?;
        match value {
            Value::Array(rows) => {
                debug!(url, rows = rows.len(), "Fetched telemetry product");
                Ok(rows)
            }
            other => Err(TelemetryError::Malformed(format!(
                "{url}: expected array of rows, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn fetch_value(&self, url: &str) -> Result<Value, TelemetryError> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(TelemetryError::Upstream(format!(
                "{url} returned HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.json::<Value>().await?)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Storm-scale parsing
// ============================================================================

/// Extract observed ("0") and next-day predicted ("1") G levels from the
/// scale table. Anything missing or unparseable becomes `None`.
pub fn parse_storm_scale(scales: Option<&Value>) -> StormScale {
    let Some(table) = scales else {
        return StormScale::default();
    };
    StormScale {
        observed: g_level(table, "0"),
        predicted: g_level(table, "1"),
    }
}

fn g_level(table: &Value, day_key: &str) -> Option<u8> {
    let raw = table.get(day_key)?.get("G")?.get("Scale")?;
    let level = match raw {
        Value::String(s) => s.parse::<u8>().ok()?,
        Value::Number(n) => u8::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    (level <= 5).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_storm_scale_observed_and_predicted() {
        let table = json!({
            "0": { "G": { "Scale": "2" }, "R": { "Scale": "0" } },
            "1": { "G": { "Scale": "3" } },
        });
        let scale = parse_storm_scale(Some(&table));
        assert_eq!(scale.observed, Some(2));
        assert_eq!(scale.predicted, Some(3));
    }

    #[test]
    fn test_parse_storm_scale_missing_table() {
        assert_eq!(parse_storm_scale(None), StormScale::default());
    }

    #[test]
    fn test_parse_storm_scale_garbage_entry() {
        let table = json!({ "0": { "G": { "Scale": "nope" } } });
        let scale = parse_storm_scale(Some(&table));
        assert_eq!(scale.observed, None);
    }

    #[test]
    fn test_parse_storm_scale_rejects_out_of_range() {
        let table = json!({ "0": { "G": { "Scale": "9" } } });
        assert_eq!(parse_storm_scale(Some(&table)).observed, None);
    }
}
