//! API handlers — consistent envelope, typed responses, ISO-8601 timestamps.
//!
//! Collaborator calls go through short-TTL caches so request volume never
//! multiplies upstream fetch volume. Every handler is fail-open: a dead
//! collaborator degrades the payload, it never turns into a 5xx.

use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::alert::AlertScheduler;
use crate::cache::{grid_key, TtlCache};
use crate::config::{self, defaults};
use crate::decision::{self, DecisionInputs};
use crate::sky::{self, CloudClient, OvationClient};
use crate::telemetry::{normalizer, TelemetrySource};
use crate::types::{
    CloudConditions, DarknessInfo, Decision, Location, SpaceWeatherReading,
};

/// Shared state behind every route.
#[derive(Clone)]
pub struct WatchState {
    pub source: TelemetrySource,
    pub clouds: CloudClient,
    pub ovation: OvationClient,
    pub alerts: Arc<AlertScheduler>,
    reading_cache: Arc<RwLock<TtlCache<(), SpaceWeatherReading>>>,
    cloud_cache: Arc<RwLock<TtlCache<(i64, i64), CloudConditions>>>,
    ovation_cache: Arc<RwLock<TtlCache<(i64, i64), f64>>>,
    started_at: Instant,
}

impl WatchState {
    pub fn new(
        source: TelemetrySource,
        clouds: CloudClient,
        ovation: OvationClient,
        alerts: Arc<AlertScheduler>,
    ) -> Self {
        Self {
            source,
            clouds,
            ovation,
            alerts,
            reading_cache: Arc::new(RwLock::new(TtlCache::new(Duration::from_secs(
                defaults::READING_CACHE_TTL_SECS,
            )))),
            cloud_cache: Arc::new(RwLock::new(TtlCache::new(Duration::from_secs(
                defaults::SKY_CACHE_TTL_SECS,
            )))),
            ovation_cache: Arc::new(RwLock::new(TtlCache::new(Duration::from_secs(
                defaults::SKY_CACHE_TTL_SECS,
            )))),
            started_at: Instant::now(),
        }
    }

    /// Current reading, served from cache when fresh. Degraded readings are
    /// not cached so recovery is picked up on the next request.
    pub async fn current_reading(&self) -> SpaceWeatherReading {
        let now = Instant::now();
        if let Some(reading) = self.reading_cache.read().await.get(&(), now) {
            return reading;
        }

        let reading = match self.source.fetch_current().await {
            Ok(raw) => normalizer::normalize(&raw, Utc::now()),
            Err(e) => {
                warn!(error = %e, "Telemetry fetch failed, substituting degraded reading");
                normalizer::degraded_reading(Utc::now())
            }
        };

        if !reading.provenance.is_degraded() {
            self.reading_cache
                .write()
                .await
                .insert((), reading.clone(), now);
        }

        // Alert evaluation rides on every fresh reading but must never
        // delay the response behind an SMTP round-trip.
        let alerts = self.alerts.clone();
        let for_alert = reading.clone();
        tokio::spawn(async move { alerts.check(&for_alert).await });

        reading
    }

    /// Cloud conditions for a location, grid-cached.
    pub async fn cloud_conditions(&self, location: Location) -> CloudConditions {
        let key = grid_key(location.latitude, location.longitude);
        let now = Instant::now();
        if let Some(conditions) = self.cloud_cache.read().await.get(&key, now) {
            return conditions;
        }
        let conditions = self.clouds.fetch(location.latitude, location.longitude).await;
        let mut cache = self.cloud_cache.write().await;
        cache.purge_expired(now);
        cache.insert(key, conditions.clone(), now);
        conditions
    }

    /// Cached ovation probability. Misses (feed down, no grid point) are not
    /// cached so a recovered feed shows up within one request.
    pub async fn ovation_probability(&self, location: Location) -> Option<f64> {
        let key = grid_key(location.latitude, location.longitude);
        let now = Instant::now();
        if let Some(p) = self.ovation_cache.read().await.get(&key, now) {
            return Some(p);
        }
        let probability = self
            .ovation
            .fetch_probability(location.latitude, location.longitude)
            .await;
        if let Some(p) = probability {
            let mut cache = self.ovation_cache.write().await;
            cache.purge_expired(now);
            cache.insert(key, p, now);
        }
        probability
    }
}

// ============================================================================
// Query / response types
// ============================================================================

/// Optional observer override. Defaults to the configured observer.
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationQuery {
    fn resolve(&self) -> Result<Location, String> {
        let observer = &config::get().observer;
        let latitude = self.latitude.unwrap_or(observer.latitude);
        let longitude = self.longitude.unwrap_or(observer.longitude);
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {latitude} out of range [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {longitude} out of range [-180, 180]"));
        }
        Ok(Location {
            latitude,
            longitude,
        })
    }
}

/// Full decision payload: the verdict plus everything that fed it.
#[derive(Debug, Serialize)]
pub struct DecisionView {
    pub decision: Decision,
    pub location: Location,
    pub reading: SpaceWeatherReading,
    pub darkness: DarknessInfo,
    pub hours_until_dark: Option<f64>,
    pub clouds: CloudConditions,
    pub visible_latitude_deg: f64,
    pub ovation_probability: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OvationView {
    pub location: Location,
    pub probability: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub version: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/v1/space-weather` — current normalized reading.
pub async fn get_space_weather(State(state): State<WatchState>) -> Response {
    ApiResponse::ok(state.current_reading().await)
}

/// `GET /api/v1/clouds` — cloud conditions for a location.
pub async fn get_clouds(
    State(state): State<WatchState>,
    Query(query): Query<LocationQuery>,
) -> Response {
    let location = match query.resolve() {
        Ok(l) => l,
        Err(msg) => return ApiErrorResponse::bad_request(msg),
    };
    ApiResponse::ok(state.cloud_conditions(location).await)
}

/// `GET /api/v1/ovation` — probability-of-visibility forecast for a location.
pub async fn get_ovation(
    State(state): State<WatchState>,
    Query(query): Query<LocationQuery>,
) -> Response {
    let location = match query.resolve() {
        Ok(l) => l,
        Err(msg) => return ApiErrorResponse::bad_request(msg),
    };
    let probability = state.ovation_probability(location).await;
    ApiResponse::ok(OvationView {
        location,
        probability,
    })
}

/// `GET /api/v1/decision` — the GO / NO-GO verdict with supporting data.
pub async fn get_decision(
    State(state): State<WatchState>,
    Query(query): Query<LocationQuery>,
) -> Response {
    let location = match query.resolve() {
        Ok(l) => l,
        Err(msg) => return ApiErrorResponse::bad_request(msg),
    };
    let now = Utc::now();

    let reading = state.current_reading().await;
    let darkness = sky::darkness_info(location.latitude, location.longitude, now);
    let hours_until_dark = sky::hours_until_dark(location.latitude, location.longitude, now);
    let clouds = state.cloud_conditions(location).await;
    let ovation_probability = state.ovation_probability(location).await;

    let decision = decision::evaluate(&DecisionInputs {
        observer: location,
        reading: &reading,
        darkness: &darkness,
        hours_until_dark,
        clouds: &clouds,
        ovation_probability,
    });

    ApiResponse::ok(DecisionView {
        decision,
        location,
        visible_latitude_deg: sky::visible_latitude(&reading),
        reading,
        darkness,
        hours_until_dark,
        clouds,
        ovation_probability,
    })
}

/// `GET /health` — liveness.
pub async fn health(State(state): State<WatchState>) -> Response {
    ApiResponse::ok(HealthView {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
