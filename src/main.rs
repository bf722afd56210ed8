//! aurora-watch - Space-Weather Decision Engine
//!
//! Answers one question: is it worth going outside right now to look for
//! aurora? Serves the answer over HTTP, mails cooldown-gated alerts when
//! conditions turn favorable, and dispatches a daily retrospective digest.
//!
//! # Usage
//!
//! ```bash
//! # Run the server with built-in defaults (Fairbanks observer)
//! cargo run --release
//!
//! # Point at a deployment config
//! cargo run --release -- --config /etc/aurora_watch.toml
//!
//! # One-shot decision to stdout, no server
//! cargo run --release -- --once
//! ```
//!
//! # Environment Variables
//!
//! - `AURORA_CONFIG`: Path to the TOML config (same as `--config`)
//! - `AURORA_CORS_ORIGINS`: Comma-separated allowed CORS origins
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use aurora_watch::api::handlers::DecisionView;
use aurora_watch::api::{create_app, WatchState};
use aurora_watch::sky::{self, CloudClient, OvationClient};
use aurora_watch::summary::DailySummaryGenerator;
use aurora_watch::types::Location;
use aurora_watch::{config, decision, AlertScheduler, SummaryStore, TelemetrySource, WatchConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "aurora-watch")]
#[command(about = "Aurora GO/NO-GO decision engine")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to the TOML configuration file
    #[arg(long, env = "AURORA_CONFIG")]
    config: Option<String>,

    /// Compute one decision for the configured observer, print it as JSON,
    /// and exit without starting the server
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    SummaryScheduler,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::SummaryScheduler => write!(f, "SummaryScheduler"),
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the daily-summary scheduler into the JoinSet.
fn spawn_summary_scheduler(
    task_set: &mut JoinSet<Result<TaskName>>,
    generator: DailySummaryGenerator,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[SummaryScheduler] Task starting");
        generator.run(cancel_token).await;
        Ok(TaskName::SummaryScheduler)
    });
}

/// Monitor spawned tasks. A task error or panic cancels everything.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// One-shot mode
// ============================================================================

/// Compute a single decision for the configured observer and print it.
async fn run_once(state: &WatchState) -> Result<()> {
    let observer = &config::get().observer;
    let location = Location {
        latitude: observer.latitude,
        longitude: observer.longitude,
    };
    let now = Utc::now();

    let reading = state.current_reading().await;
    let darkness = sky::darkness_info(location.latitude, location.longitude, now);
    let hours_until_dark = sky::hours_until_dark(location.latitude, location.longitude, now);
    let clouds = state.cloud_conditions(location).await;
    let ovation_probability = state.ovation_probability(location).await;

    let verdict = decision::evaluate(&decision::DecisionInputs {
        observer: location,
        reading: &reading,
        darkness: &darkness,
        hours_until_dark,
        clouds: &clouds,
        ovation_probability,
    });

    let view = DecisionView {
        decision: verdict,
        location,
        visible_latitude_deg: sky::visible_latitude(&reading),
        reading,
        darkness,
        hours_until_dark,
        clouds,
        ovation_probability,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&view).context("Failed to serialize decision")?
    );
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    // Load watch configuration
    let watch_config = match &args.config {
        Some(path) => WatchConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => WatchConfig::load(),
    };
    info!(
        "Observer: {:.2}, {:.2} ({})",
        watch_config.observer.latitude,
        watch_config.observer.longitude,
        watch_config.observer.timezone
    );
    let server_addr = args
        .addr
        .clone()
        .unwrap_or_else(|| watch_config.server.addr.clone());
    let summary_cfg = watch_config.summary.clone();
    config::init(watch_config);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  aurora-watch - Space-Weather Decision Engine");
    info!("  GO / NO-GO aurora calls from live solar-wind telemetry");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Shared collaborator clients and alert state
    let source = TelemetrySource::new().context("Failed to build telemetry client")?;
    let clouds = CloudClient::new().context("Failed to build cloud client")?;
    let ovation = OvationClient::new().context("Failed to build ovation client")?;
    let alerts = Arc::new(AlertScheduler::from_config());
    let state = WatchState::new(source.clone(), clouds, ovation, alerts.clone());

    if args.once {
        info!("📡 One-shot mode: fetching telemetry and computing a decision");
        return run_once(&state).await;
    }

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {server_addr}"))?;
    info!("✓ HTTP server listening on {}", server_addr);
    info!("🎯 Decision endpoint: http://{}/api/v1/decision", server_addr);
    info!("");

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    if summary_cfg.enabled {
        let store = SummaryStore::open(&summary_cfg.state_path)
            .with_context(|| format!("Failed to open summary store at {}", summary_cfg.state_path))?;
        let generator = DailySummaryGenerator::new(source, store, alerts);
        spawn_summary_scheduler(&mut task_set, generator, cancel_token.clone());
    } else {
        info!("Daily summary disabled by config");
    }

    run_supervisor(&mut task_set, cancel_token).await?;

    info!("");
    info!("✓ aurora-watch shutdown complete");
    Ok(())
}
