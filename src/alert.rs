//! Cooldown- and darkness-gated alert dispatch
//!
//! Fires at most one notification per cooldown window when a reading turns
//! favorable (`similarity >= min AND bz < max_bz`). Darkness is re-checked
//! at the configured reference location before dispatch — a daytime GO
//! condition never produces mail.
//!
//! Dispatch failures are logged and swallowed; the cooldown is consumed on
//! the *attempt*, so a flaky SMTP relay cannot turn into an alert storm.

use chrono::Utc;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{self, SmtpConfig, SmtpTls};
use crate::sky::darkness;
use crate::types::SpaceWeatherReading;

/// Notification transport errors. Logged, never propagated into the
/// decision/score pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("mail transport not configured")]
    NotConfigured,
    #[error("invalid address: {0}")]
    Address(String),
    #[error("smtp error: {0}")]
    Smtp(String),
}

// ============================================================================
// Gate — pure cooldown state machine
// ============================================================================

/// The single piece of process-wide mutable alert state. Process lifetime
/// only; not persisted across restarts.
#[derive(Debug)]
pub struct AlertGate {
    cooldown: Duration,
    min_similarity: u8,
    max_bz_nt: f64,
    last_dispatch: Option<Instant>,
}

impl AlertGate {
    pub fn new(cooldown: Duration, min_similarity: u8, max_bz_nt: f64) -> Self {
        Self {
            cooldown,
            min_similarity,
            max_bz_nt,
            last_dispatch: None,
        }
    }

    /// Whether the reading itself merits an alert, cooldown aside.
    pub fn qualifies(&self, reading: &SpaceWeatherReading) -> bool {
        reading.similarity_score >= self.min_similarity && reading.bz < self.max_bz_nt
    }

    /// Consume the cooldown window if it has elapsed. Returns false while
    /// still inside the window.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = self
            .last_dispatch
            .map_or(true, |last| now.duration_since(last) > self.cooldown);
        if elapsed {
            self.last_dispatch = Some(now);
        }
        elapsed
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Checks each fresh reading against the gate and dispatches mail.
pub struct AlertScheduler {
    gate: tokio::sync::Mutex<AlertGate>,
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl AlertScheduler {
    /// Build from the global config. A missing or incomplete SMTP section
    /// disables dispatch but keeps the gate logic running (useful in logs).
    pub fn from_config() -> Self {
        let cfg = config::get();
        let mailer = match build_mailer(&cfg.smtp) {
            Ok(m) => Some(m),
            Err(DispatchError::NotConfigured) => {
                info!("SMTP not configured — alert dispatch disabled");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to build mail transport — alert dispatch disabled");
                None
            }
        };
        Self {
            gate: tokio::sync::Mutex::new(AlertGate::new(
                Duration::from_secs(cfg.alerts.cooldown_minutes * 60),
                cfg.alerts.min_similarity,
                cfg.alerts.max_bz_nt,
            )),
            mailer,
        }
    }

    /// Run the full gated check for one reading. Called on every reading
    /// request; never raises.
    pub async fn check(&self, reading: &SpaceWeatherReading) {
        let cfg = config::get();
        if !cfg.alerts.enabled {
            return;
        }

        {
            let gate = self.gate.lock().await;
            if !gate.qualifies(reading) {
                return;
            }
        }

        // Darkness re-check at the alert reference location. A favorable
        // reading during daylight is logged and dropped without consuming
        // the cooldown — the evening alert must still fire.
        let info = darkness::darkness_info(
            cfg.alerts.reference_latitude,
            cfg.alerts.reference_longitude,
            Utc::now(),
        );
        if !info.can_view_aurora {
            debug!(
                solar_altitude = info.solar_altitude_deg,
                "Alert conditions met but reference location is not dark — suppressed"
            );
            return;
        }

        {
            let mut gate = self.gate.lock().await;
            if !gate.try_consume(Instant::now()) {
                debug!("Alert conditions met but cooldown active — suppressed");
                return;
            }
        }

        let (subject, body) = compose_alert(reading);
        info!(
            similarity = reading.similarity_score,
            bz = reading.bz,
            "🌌 Alert conditions met — dispatching notification"
        );
        // Cooldown already consumed; a transport failure stays swallowed.
        if let Err(e) = self.send_mail(&subject, &body).await {
            warn!(error = %e, "Alert dispatch failed (cooldown remains consumed)");
        }
    }

    /// Send a plain-text mail to the configured recipients. Shared by the
    /// alert path and the daily summary.
    pub async fn send_mail(&self, subject: &str, body: &str) -> Result<(), DispatchError> {
        let mailer = self.mailer.as_ref().ok_or(DispatchError::NotConfigured)?;
        let cfg = config::get();
        let from: Mailbox = cfg
            .smtp
            .from
            .as_deref()
            .ok_or(DispatchError::NotConfigured)?
            .parse()
            .map_err(|e| DispatchError::Address(format!("from: {e}")))?;

        let mut builder = Message::builder().from(from).subject(subject);
        if cfg.alerts.recipients.is_empty() {
            return Err(DispatchError::NotConfigured);
        }
        for recipient in &cfg.alerts.recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| DispatchError::Address(format!("{recipient}: {e}")))?;
            builder = builder.to(to);
        }
        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| DispatchError::Smtp(e.to_string()))?;

        mailer
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| DispatchError::Smtp(e.to_string()))
    }
}

/// Build the SMTP transport with the configured TLS mode and port.
fn build_mailer(
    smtp: &SmtpConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchError> {
    if !smtp.is_configured() {
        return Err(DispatchError::NotConfigured);
    }
    let server = smtp.server.as_deref().ok_or(DispatchError::NotConfigured)?;
    let creds = Credentials::new(
        smtp.username.clone().ok_or(DispatchError::NotConfigured)?,
        smtp.password.clone().ok_or(DispatchError::NotConfigured)?,
    );
    let port = smtp
        .port
        .unwrap_or(if smtp.tls == SmtpTls::Implicit { 465 } else { 587 });

    let transport = match smtp.tls {
        SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(server)
            .map_err(|e| DispatchError::Smtp(e.to_string()))?
            .port(port)
            .credentials(creds)
            .build(),
        SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| DispatchError::Smtp(e.to_string()))?
            .port(port)
            .credentials(creds)
            .build(),
    };
    Ok(transport)
}

/// Subject and plain-text body for an alert. Pure, testable.
pub fn compose_alert(reading: &SpaceWeatherReading) -> (String, String) {
    let subject = format!(
        "Aurora alert: similarity {} (bz {:.1} nT)",
        reading.similarity_score, reading.bz
    );
    let body = format!(
        "Aurora conditions turned favorable at {}.\n\n\
         Similarity score: {} / 99\n\
         Bz: {:.1} nT ({} min southward of the last 60)\n\
         Solar wind: {:.0} km/s, {:.1} p/cm3, {:.2} nPa\n\
         Bt: {:.1} nT, clock angle {:.0}°\n\n\
         Step outside and look north.\n",
        reading.timestamp.format("%Y-%m-%d %H:%M UTC"),
        reading.similarity_score,
        reading.bz,
        reading.southward_duration_min,
        reading.speed,
        reading.density,
        reading.dynamic_pressure,
        reading.bt,
        reading.clock_angle,
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, StormScale};
    use chrono::Utc;

    fn reading(similarity: u8, bz: f64) -> SpaceWeatherReading {
        SpaceWeatherReading {
            timestamp: Utc::now(),
            speed: 600.0,
            density: 10.0,
            temperature: 200_000.0,
            bx: 1.0,
            by: 2.0,
            bz,
            bt: bz.abs() + 3.0,
            dynamic_pressure: 6.0,
            clock_angle: 180.0,
            southward_duration_min: 30,
            similarity_score: similarity,
            storm_scale: StormScale::default(),
            provenance: Provenance::Live,
        }
    }

    fn gate() -> AlertGate {
        AlertGate::new(Duration::from_secs(3600), 40, -5.0)
    }

    #[test]
    fn test_qualifies_needs_both_conditions() {
        let g = gate();
        assert!(g.qualifies(&reading(40, -5.1)));
        assert!(!g.qualifies(&reading(39, -20.0)));
        assert!(!g.qualifies(&reading(80, -5.0)));
        assert!(!g.qualifies(&reading(80, 3.0)));
    }

    #[test]
    fn test_cooldown_allows_exactly_one_dispatch() {
        let mut g = gate();
        let t0 = Instant::now();
        assert!(g.try_consume(t0));
        // A second qualifying reading 10 minutes later: suppressed.
        assert!(!g.try_consume(t0 + Duration::from_secs(600)));
        // Past the window: allowed again.
        assert!(g.try_consume(t0 + Duration::from_secs(3601)));
    }

    #[test]
    fn test_cooldown_boundary_is_exclusive() {
        let mut g = gate();
        let t0 = Instant::now();
        assert!(g.try_consume(t0));
        assert!(!g.try_consume(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn test_compose_alert_mentions_key_fields() {
        let (subject, body) = compose_alert(&reading(62, -12.3));
        assert!(subject.contains("62"));
        assert!(subject.contains("-12.3"));
        assert!(body.contains("km/s"));
        assert!(!body.is_empty());
    }
}
