//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* endpoints using `tower::ServiceExt::oneshot()`. Upstream
//! collaborators are served by a local fixture router on an ephemeral port,
//! wired in through the endpoint overrides in the config.
//!
//! The config global is process-wide, so everything runs inside one test
//! function with one fixture server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use aurora_watch::api::{create_app, WatchState};
use aurora_watch::config::{self, WatchConfig};
use aurora_watch::sky::{CloudClient, OvationClient};
use aurora_watch::{AlertScheduler, TelemetrySource};

// ============================================================================
// Upstream fixtures
// ============================================================================

async fn plasma() -> Json<Value> {
    Json(json!([
        ["time_tag", "density", "speed", "temperature"],
        ["2026-08-23 10:00:00.000", "6.1", "420.5", "120000"],
        ["2026-08-23 10:05:00.000", "5.8", "415.0", "118000"]
    ]))
}

async fn magnetometer() -> Json<Value> {
    Json(json!([
        ["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"],
        ["2026-08-23 10:04:00.000", "2.0", "1.0", "-2.2", "0.0", "0.0", "3.5"],
        ["2026-08-23 10:05:00.000", "2.1", "1.1", "-2.0", "0.0", "0.0", "3.4"]
    ]))
}

async fn scales() -> Json<Value> {
    Json(json!({
        "0": { "G": { "Scale": "1" } },
        "1": { "G": { "Scale": "0" } }
    }))
}

async fn ovation() -> Json<Value> {
    Json(json!({
        "coordinates": [
            [212, 65, 12.0],
            [213, 65, 42.0]
        ]
    }))
}

async fn clouds() -> Json<Value> {
    Json(json!({
        "current": {
            "cloud_cover": 35.0,
            "cloud_cover_low": 25.0,
            "cloud_cover_mid": 10.0,
            "cloud_cover_high": 5.0
        },
        "hourly": { "cloud_cover_low": [25.0, 10.0, 8.0, 5.0] }
    }))
}

/// Serve the upstream fixtures on an ephemeral local port.
async fn start_fixture_server() -> String {
    let router = Router::new()
        .route("/plasma", get(plasma))
        .route("/mag", get(magnetometer))
        .route("/scales", get(scales))
        .route("/ovation", get(ovation))
        .route("/clouds", get(clouds));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture server");
    let addr = listener.local_addr().expect("fixture addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

fn test_config(base: &str) -> WatchConfig {
    let mut cfg = WatchConfig::default();
    cfg.endpoints.plasma = format!("{base}/plasma");
    cfg.endpoints.magnetometer = format!("{base}/mag");
    cfg.endpoints.plasma_daily = format!("{base}/plasma");
    cfg.endpoints.magnetometer_daily = format!("{base}/mag");
    cfg.endpoints.scales = format!("{base}/scales");
    cfg.endpoints.ovation = format!("{base}/ovation");
    cfg.endpoints.clouds = format!("{base}/clouds");
    cfg.alerts.enabled = false;
    cfg
}

fn state() -> WatchState {
    WatchState::new(
        TelemetrySource::new().expect("telemetry client"),
        CloudClient::new().expect("cloud client"),
        OvationClient::new().expect("ovation client"),
        Arc::new(AlertScheduler::from_config()),
    )
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

// ============================================================================
// The suite
// ============================================================================

#[tokio::test]
async fn api_endpoints_against_fixture_upstreams() {
    let base = start_fixture_server().await;
    config::init(test_config(&base));

    let state = state();

    // Health: always 200, enveloped.
    let (status, body) = get_json(create_app(state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["meta"]["version"], "1");

    // Space weather: normalized latest-valid rows from the fixtures.
    let (status, body) = get_json(create_app(state.clone()), "/api/v1/space-weather").await;
    assert_eq!(status, StatusCode::OK);
    let reading = &body["data"];
    assert_eq!(reading["provenance"], "live");
    assert_eq!(reading["speed"], 415.0);
    assert_eq!(reading["density"], 5.8);
    assert_eq!(reading["bz"], -2.0);
    assert_eq!(reading["storm_scale"]["observed"], 1);
    let first_timestamp = reading["timestamp"].clone();

    // Second request inside the TTL is served from cache: same timestamp.
    let (_, body) = get_json(create_app(state.clone()), "/api/v1/space-weather").await;
    assert_eq!(body["data"]["timestamp"], first_timestamp);

    // Clouds: parsed fixture with a clearing trend (25 -> mean 7.7).
    let (status, body) = get_json(
        create_app(state.clone()),
        "/api/v1/clouds?latitude=64.8&longitude=-147.7",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["low"], 25.0);
    assert_eq!(body["data"]["trend"], "clearing");
    assert_eq!(body["data"]["provenance"], "live");

    // Ovation: nearest grid point for -147.2 east-normalizes to 213.
    let (status, body) = get_json(
        create_app(state.clone()),
        "/api/v1/ovation?latitude=64.8&longitude=-147.2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["probability"], 42.0);

    // Decision: full composed payload for the default observer.
    let (status, body) = get_json(create_app(state.clone()), "/api/v1/decision").await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert!(data["decision"]["verdict"].is_string());
    assert!(!data["decision"]["reason"].as_str().unwrap_or("").is_empty());
    assert_eq!(data["reading"]["provenance"], "live");
    assert!(data["darkness"]["solar_altitude_deg"].is_number());
    assert!(data["visible_latitude_deg"].is_number());
    assert_eq!(data["clouds"]["low"], 25.0);

    // Out-of-range coordinates are a 400 with the error envelope.
    let (status, body) = get_json(
        create_app(state.clone()),
        "/api/v1/decision?latitude=123.0&longitude=0.0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Unknown path falls through to 404.
    let resp = create_app(state)
        .oneshot(
            Request::builder()
                .uri("/api/v1/nope")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
