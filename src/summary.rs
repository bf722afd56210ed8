//! Daily retrospective digest
//!
//! Once per local morning, summarize the prior UTC day's telemetry from the
//! 1-day history products: channel min/max/avg, sustained-southward minutes,
//! peak similarity, and a qualitative verdict. A sled-backed sent-date guard
//! keeps the digest to exactly one dispatch per day across restarts.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::AlertScheduler;
use crate::config::{self, defaults};
use crate::storage::SummaryStore;
use crate::telemetry::normalizer::{
    data_rows, field, MAG_BT, MAG_BX, MAG_BY, MAG_BZ, PLASMA_DENSITY, PLASMA_SPEED,
    PLASMA_TEMPERATURE,
};
use crate::telemetry::{scorer, RawTelemetry, TelemetrySource};
use crate::types::{ChannelStats, DailySummary, SummaryVerdict};

/// Bz threshold (nT) below which a minute counts as "good aurora time" in
/// the retrospective. Stricter than the live sustained-southward threshold.
const SUMMARY_SOUTHWARD_BZ_NT: f64 = -5.0;

// ============================================================================
// Aggregation
// ============================================================================

/// Aggregate one UTC day of history rows into a digest. `None` when the day
/// has no valid samples at all, in which case nothing should be sent.
pub fn build_summary(raw: &RawTelemetry, date: NaiveDate) -> Option<DailySummary> {
    let day_prefix = date.format("%Y-%m-%d").to_string();

    let plasma: Vec<&Value> = rows_for_day(&raw.plasma, &day_prefix);
    let mag: Vec<&Value> = rows_for_day(&raw.magnetometer, &day_prefix);

    let speeds = channel(&plasma, PLASMA_SPEED);
    let densities = channel(&plasma, PLASMA_DENSITY);
    let bzs = channel(&mag, MAG_BZ);
    let bts: Vec<f64> = mag.iter().filter_map(|row| bt_of(row)).collect();

    let southward_minutes = bzs.iter().filter(|&&bz| bz < SUMMARY_SOUTHWARD_BZ_NT).count() as u32;

    let (peak_similarity, peak_timestamp, sample_count) = peak_over_pairs(&plasma, &mag);

    let summary = DailySummary {
        date,
        speed: ChannelStats::of(&speeds)?,
        density: ChannelStats::of(&densities)?,
        bz: ChannelStats::of(&bzs)?,
        bt: ChannelStats::of(&bts)?,
        southward_minutes,
        peak_similarity,
        peak_timestamp,
        verdict: classify_verdict(peak_similarity, ChannelStats::of(&bzs)?.min),
        sample_count,
    };
    Some(summary)
}

/// Data rows whose time_tag falls on the given day.
fn rows_for_day<'a>(rows: &'a [Value], day_prefix: &str) -> Vec<&'a Value> {
    data_rows(rows)
        .iter()
        .filter(|row| {
            row.get(0)
                .and_then(Value::as_str)
                .is_some_and(|tag| tag.starts_with(day_prefix))
        })
        .collect()
}

fn channel(rows: &[&Value], idx: usize) -> Vec<f64> {
    rows.iter().filter_map(|row| field(row, idx)).collect()
}

/// Bt for a mag row, synthesized from components when the column is absent.
fn bt_of(row: &Value) -> Option<f64> {
    field(row, MAG_BT).or_else(|| {
        let bx = field(row, MAG_BX)?;
        let by = field(row, MAG_BY)?;
        let bz = field(row, MAG_BZ)?;
        Some((bx * bx + by * by + bz * bz).sqrt())
    })
}

/// Rescore every plasma/mag pair sharing a time_tag and keep the peak.
/// Instant scoring only; the rolling southward window does not apply to
/// historical pairs.
fn peak_over_pairs(
    plasma: &[&Value],
    mag: &[&Value],
) -> (u8, Option<DateTime<Utc>>, usize) {
    let mag_by_tag: HashMap<&str, &Value> = mag
        .iter()
        .filter_map(|row| Some((row.get(0)?.as_str()?, *row)))
        .collect();

    let mut peak: u8 = 0;
    let mut peak_tag: Option<&str> = None;
    let mut pairs = 0usize;

    for row in plasma {
        let Some(tag) = row.get(0).and_then(Value::as_str) else {
            continue;
        };
        let Some(mag_row) = mag_by_tag.get(tag) else {
            continue;
        };
        let (Some(density), Some(speed)) =
            (field(row, PLASMA_DENSITY), field(row, PLASMA_SPEED))
        else {
            continue;
        };
        let Some(bz) = field(mag_row, MAG_BZ) else {
            continue;
        };
        let Some(bt) = bt_of(mag_row) else {
            continue;
        };
        let temperature = field(row, PLASMA_TEMPERATURE).unwrap_or(0.0);
        let pressure = 1.6726e-6 * density * speed * speed;

        pairs += 1;
        let score = scorer::score_instant(speed, density, bz, bt, pressure, temperature);
        if score > peak {
            peak = score;
            peak_tag = Some(tag);
        }
    }

    (peak, peak_tag.and_then(parse_time_tag), pairs)
}

/// Parse a product time_tag into UTC. The feeds use a space separator and
/// sometimes fractional seconds.
fn parse_time_tag(tag: &str) -> Option<DateTime<Utc>> {
    for format in ["%Y-%m-%d %H:%M:%S%.3f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(tag, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Qualitative verdict for the day.
pub fn classify_verdict(peak_similarity: u8, min_bz: f64) -> SummaryVerdict {
    if peak_similarity >= 50 && min_bz < -10.0 {
        SummaryVerdict::Excellent
    } else if peak_similarity >= 35 && min_bz < -5.0 {
        SummaryVerdict::Good
    } else if peak_similarity >= 20 || min_bz < -3.0 {
        SummaryVerdict::Moderate
    } else {
        SummaryVerdict::Quiet
    }
}

/// Plain-text mail for a digest.
pub fn compose_summary(summary: &DailySummary) -> (String, String) {
    let subject = format!(
        "Aurora daily summary {}: {} (peak {})",
        summary.date, summary.verdict, summary.peak_similarity
    );
    let peak_line = match summary.peak_timestamp {
        Some(ts) => format!(
            "Peak similarity {} at {}",
            summary.peak_similarity,
            ts.format("%H:%M UTC")
        ),
        None => format!("Peak similarity {}", summary.peak_similarity),
    };
    let body = format!(
        "Space weather digest for {} (UTC).\n\n\
         Verdict: {}\n\
         {}\n\
         Good aurora time (bz < -5 nT): {} min\n\n\
         Speed   min {:.0} / max {:.0} / avg {:.0} km/s\n\
         Density min {:.1} / max {:.1} / avg {:.1} p/cm3\n\
         Bz      min {:.1} / max {:.1} / avg {:.1} nT\n\
         Bt      min {:.1} / max {:.1} / avg {:.1} nT\n\n\
         {} paired samples.\n",
        summary.date,
        summary.verdict,
        peak_line,
        summary.southward_minutes,
        summary.speed.min,
        summary.speed.max,
        summary.speed.avg,
        summary.density.min,
        summary.density.max,
        summary.density.avg,
        summary.bz.min,
        summary.bz.max,
        summary.bz.avg,
        summary.bt.min,
        summary.bt.max,
        summary.bt.avg,
        summary.sample_count,
    );
    (subject, body)
}

// ============================================================================
// Schedule
// ============================================================================

/// Whether the local civil time sits inside the dispatch window
/// `[hour:00, hour:00 + window_minutes)`.
pub fn in_trigger_window(local_hour: u32, local_minute: u32, hour: u32, window_minutes: i64) -> bool {
    local_hour == hour && i64::from(local_minute) < window_minutes
}

/// Background task: tick once a minute and dispatch the prior-day digest
/// when the local trigger window opens.
pub struct DailySummaryGenerator {
    source: TelemetrySource,
    store: SummaryStore,
    alerts: Arc<AlertScheduler>,
}

impl DailySummaryGenerator {
    pub fn new(source: TelemetrySource, store: SummaryStore, alerts: Arc<AlertScheduler>) -> Self {
        Self {
            source,
            store,
            alerts,
        }
    }

    /// Tick loop. Runs until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(defaults::SUMMARY_CHECK_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Summary scheduler stopping");
                    return;
                }
                _ = interval.tick() => self.tick(Utc::now()).await,
            }
        }
    }

    async fn tick(&self, now_utc: DateTime<Utc>) {
        let cfg = config::get();
        if !cfg.summary.enabled {
            return;
        }

        let local = cfg.observer.timezone.from_utc_datetime(&now_utc.naive_utc());
        if !in_trigger_window(
            local.hour(),
            local.minute(),
            cfg.summary.hour,
            cfg.summary.window_minutes,
        ) {
            return;
        }

        // The digest always covers the previous complete UTC day.
        let target = now_utc.date_naive().pred_opt();
        let Some(target) = target else { return };
        if self.store.last_sent_date() == Some(target) {
            return;
        }

        info!(date = %target, "Summary window open, generating digest");
        let raw = match self.source.fetch_prior_day().await {
            Ok(raw) => raw,
            Err(e) => {
                // Leave the guard untouched; the next tick inside the window
                // retries.
                warn!(error = %e, "Daily history fetch failed, will retry");
                return;
            }
        };

        let Some(summary) = build_summary(&raw, target) else {
            debug!(date = %target, "No valid samples for the day, skipping digest");
            return;
        };

        let (subject, body) = compose_summary(&summary);
        info!(
            date = %target,
            verdict = %summary.verdict,
            peak = summary.peak_similarity,
            "📊 Dispatching daily summary"
        );
        if let Err(e) = self.alerts.send_mail(&subject, &body).await {
            warn!(error = %e, "Summary dispatch failed");
        }
        // Guard is written after the attempt so a flaky relay cannot cause
        // a mail storm inside the window.
        if let Err(e) = self.store.mark_sent(target) {
            warn!(error = %e, "Failed to persist summary sent-date");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plasma_product(rows: &[(&str, f64, f64, f64)]) -> Vec<Value> {
        let mut out = vec![json!(["time_tag", "density", "speed", "temperature"])];
        for (t, d, s, temp) in rows {
            out.push(json!([t, d.to_string(), s.to_string(), temp.to_string()]));
        }
        out
    }

    fn mag_product(rows: &[(&str, f64, f64, f64, f64)]) -> Vec<Value> {
        let mut out = vec![json!([
            "time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"
        ])];
        for (t, bx, by, bz, bt) in rows {
            out.push(json!([
                t,
                bx.to_string(),
                by.to_string(),
                bz.to_string(),
                "0.0",
                "0.0",
                bt.to_string()
            ]));
        }
        out
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    #[test]
    fn test_build_summary_stats_and_peak() {
        let raw = RawTelemetry {
            plasma: plasma_product(&[
                ("2026-08-23 01:00:00.000", 5.0, 400.0, 100_000.0),
                ("2026-08-23 12:00:00.000", 20.0, 700.0, 400_000.0),
                ("2026-08-23 23:00:00.000", 8.0, 500.0, 200_000.0),
            ]),
            magnetometer: mag_product(&[
                ("2026-08-23 01:00:00.000", 1.0, 2.0, 1.0, 3.0),
                ("2026-08-23 12:00:00.000", 2.0, 5.0, -22.0, 25.0),
                ("2026-08-23 23:00:00.000", 1.0, 3.0, -6.0, 8.0),
            ]),
            scales: None,
        };
        let summary = build_summary(&raw, day()).unwrap();

        assert_eq!(summary.speed.min, 400.0);
        assert_eq!(summary.speed.max, 700.0);
        assert_eq!(summary.bz.min, -22.0);
        assert_eq!(summary.southward_minutes, 2);
        assert_eq!(summary.sample_count, 3);
        // The storm-time pair at noon dominates.
        assert!(summary.peak_similarity > 60);
        assert_eq!(
            summary.peak_timestamp.map(|t| t.hour()),
            Some(12)
        );
        assert_eq!(summary.verdict, SummaryVerdict::Excellent);
    }

    #[test]
    fn test_build_summary_filters_other_days() {
        let raw = RawTelemetry {
            plasma: plasma_product(&[
                ("2026-08-22 23:55:00.000", 30.0, 900.0, 500_000.0),
                ("2026-08-23 01:00:00.000", 5.0, 400.0, 100_000.0),
            ]),
            magnetometer: mag_product(&[
                ("2026-08-22 23:55:00.000", 1.0, 1.0, -30.0, 35.0),
                ("2026-08-23 01:00:00.000", 1.0, 2.0, 1.0, 3.0),
            ]),
            scales: None,
        };
        let summary = build_summary(&raw, day()).unwrap();
        // The previous day's storm row is excluded.
        assert_eq!(summary.speed.max, 400.0);
        assert_eq!(summary.southward_minutes, 0);
        assert_eq!(summary.verdict, SummaryVerdict::Quiet);
    }

    #[test]
    fn test_build_summary_empty_day_is_none() {
        let raw = RawTelemetry {
            plasma: plasma_product(&[("2026-08-22 10:00:00.000", 5.0, 400.0, 100_000.0)]),
            magnetometer: mag_product(&[("2026-08-22 10:00:00.000", 1.0, 1.0, 1.0, 2.0)]),
            scales: None,
        };
        assert!(build_summary(&raw, day()).is_none());
    }

    #[test]
    fn test_unpaired_rows_still_count_in_stats() {
        let raw = RawTelemetry {
            plasma: plasma_product(&[("2026-08-23 01:00:00.000", 5.0, 400.0, 100_000.0)]),
            magnetometer: mag_product(&[
                ("2026-08-23 01:00:00.000", 1.0, 2.0, 1.0, 3.0),
                ("2026-08-23 01:01:00.000", 1.0, 2.0, -8.0, 9.0),
            ]),
            scales: None,
        };
        let summary = build_summary(&raw, day()).unwrap();
        assert_eq!(summary.bz.min, -8.0);
        assert_eq!(summary.sample_count, 1);
    }

    #[test]
    fn test_classify_verdict_bands() {
        assert_eq!(classify_verdict(70, -15.0), SummaryVerdict::Excellent);
        assert_eq!(classify_verdict(40, -7.0), SummaryVerdict::Good);
        assert_eq!(classify_verdict(25, -1.0), SummaryVerdict::Moderate);
        assert_eq!(classify_verdict(10, -4.0), SummaryVerdict::Moderate);
        assert_eq!(classify_verdict(10, 1.0), SummaryVerdict::Quiet);
    }

    #[test]
    fn test_trigger_window_bounds() {
        assert!(in_trigger_window(8, 0, 8, 5));
        assert!(in_trigger_window(8, 4, 8, 5));
        assert!(!in_trigger_window(8, 5, 8, 5));
        assert!(!in_trigger_window(7, 59, 8, 5));
        assert!(!in_trigger_window(9, 0, 8, 5));
    }

    #[test]
    fn test_parse_time_tag_formats() {
        assert!(parse_time_tag("2026-08-23 12:00:00.000").is_some());
        assert!(parse_time_tag("2026-08-23 12:00:00").is_some());
        assert!(parse_time_tag("not a time").is_none());
    }

    #[test]
    fn test_compose_summary_mentions_verdict() {
        let raw = RawTelemetry {
            plasma: plasma_product(&[("2026-08-23 01:00:00.000", 5.0, 400.0, 100_000.0)]),
            magnetometer: mag_product(&[("2026-08-23 01:00:00.000", 1.0, 2.0, 1.0, 3.0)]),
            scales: None,
        };
        let summary = build_summary(&raw, day()).unwrap();
        let (subject, body) = compose_summary(&summary);
        assert!(subject.contains("2026-08-23"));
        assert!(body.contains("Verdict"));
    }
}
