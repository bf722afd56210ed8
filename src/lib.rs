//! aurora-watch: aurora GO / NO-GO decision engine
//!
//! Turns raw space-weather telemetry into one actionable answer: is it
//! worth stepping outside right now to look for aurora?
//!
//! ## Pipeline
//!
//! - **telemetry**: fetch + normalize solar-wind plasma/magnetometer feeds,
//!   severe-storm similarity scoring
//! - **sky**: solar darkness model, visibility-latitude estimate, cloud and
//!   ovation collaborators
//! - **decision**: short-circuit rule chain plus weighted go-score
//! - **alert** / **summary**: cooldown-gated notifications and the daily
//!   retrospective digest
//! - **api**: read-only Axum surface with a uniform envelope

pub mod alert;
pub mod api;
pub mod cache;
pub mod config;
pub mod decision;
pub mod sky;
pub mod storage;
pub mod summary;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use types::{
    CloudConditions, CloudTrend, Confidence, DailySummary, DarknessInfo, DarknessLevel,
    Decision, Location, Provenance, ReasonCode, SpaceWeatherReading, StormScale,
    SummaryVerdict, Verdict,
};

pub use alert::AlertScheduler;
pub use api::{create_app, WatchState};
pub use config::WatchConfig;
pub use decision::{evaluate, DecisionInputs};
pub use storage::{StorageError, SummaryStore};
pub use summary::DailySummaryGenerator;
pub use telemetry::{RawTelemetry, TelemetryError, TelemetrySource};
