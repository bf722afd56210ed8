//! Watch Configuration - deployment-tunable TOML values
//!
//! Every struct implements `Default` with values matching the built-in
//! constants, ensuring sane behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a watch deployment.
///
/// Load with `WatchConfig::load()` which searches:
/// 1. `$AURORA_CONFIG` env var
/// 2. `./aurora_watch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchConfig {
    /// Fixed observer location and timezone
    #[serde(default)]
    pub observer: ObserverConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Alert gating and recipients
    #[serde(default)]
    pub alerts: AlertConfig,

    /// SMTP transport for alert + summary mail
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Daily summary schedule
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Upstream endpoint overrides (tests point these at local fixtures)
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl WatchConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AURORA_CONFIG` environment variable
    /// 2. `./aurora_watch.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("AURORA_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded watch config from AURORA_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from AURORA_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "AURORA_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("aurora_watch.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded watch config from ./aurora_watch.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./aurora_watch.toml, using defaults");
                }
            }
        }

        info!("Using built-in default configuration");
        Self::default()
    }

    /// Load and parse a TOML config file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check ranges that would otherwise fail silently at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.observer.latitude) {
            return Err(ConfigError::Invalid(format!(
                "observer.latitude {} out of range [-90, 90]",
                self.observer.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.observer.longitude) {
            return Err(ConfigError::Invalid(format!(
                "observer.longitude {} out of range [-180, 180]",
                self.observer.longitude
            )));
        }
        if self.alerts.cooldown_minutes == 0 {
            return Err(ConfigError::Invalid(
                "alerts.cooldown_minutes must be at least 1".to_string(),
            ));
        }
        if self.summary.hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "summary.hour {} out of range [0, 23]",
                self.summary.hour
            )));
        }
        Ok(())
    }
}

/// Configuration load/parse errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(String, String),
    #[error("failed to parse {0}: {1}")]
    Parse(String, String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Observer
// ============================================================================

/// Fixed observer location the engine answers GO/NO-GO for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone for the daily summary schedule.
    pub timezone: chrono_tz::Tz,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        // Fairbanks, AK — under the auroral oval more nights than not.
        Self {
            latitude: 64.84,
            longitude: -147.72,
            timezone: chrono_tz::America::Anchorage,
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// Cooldown- and darkness-gated alert dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Minimum minutes between two dispatches.
    pub cooldown_minutes: u64,
    /// Similarity score at or above which an alert qualifies.
    pub min_similarity: u8,
    /// Bz must be below this (nT) for an alert to qualify.
    pub max_bz_nt: f64,
    /// Darkness is re-checked at this location before dispatch, independent
    /// of any visiting user's location.
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    /// Recipient addresses for alert and summary mail.
    pub recipients: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let observer = ObserverConfig::default();
        Self {
            enabled: true,
            cooldown_minutes: defaults::ALERT_COOLDOWN_MIN,
            min_similarity: defaults::ALERT_MIN_SIMILARITY,
            max_bz_nt: defaults::ALERT_MAX_BZ_NT,
            reference_latitude: observer.latitude,
            reference_longitude: observer.longitude,
            recipients: Vec::new(),
        }
    }
}

// ============================================================================
// SMTP
// ============================================================================

/// SMTP TLS mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SmtpTls {
    /// STARTTLS upgrade, usually port 587.
    #[default]
    Starttls,
    /// Implicit TLS, usually port 465.
    Implicit,
}

/// Mail transport configuration. All fields optional; mail dispatch is
/// silently disabled when the transport is incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub tls: SmtpTls,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl SmtpConfig {
    /// Whether enough fields are present to build a transport.
    pub fn is_configured(&self) -> bool {
        self.server.is_some()
            && self.username.is_some()
            && self.password.is_some()
            && self.from.is_some()
    }
}

// ============================================================================
// Daily summary
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub enabled: bool,
    /// Local-civil hour the digest goes out.
    pub hour: u32,
    /// Trigger window around the target, minutes.
    pub window_minutes: i64,
    /// Path of the sled store holding the sent-date guard.
    pub state_path: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: defaults::SUMMARY_HOUR_LOCAL,
            window_minutes: defaults::SUMMARY_WINDOW_MIN,
            state_path: "./data/summary_state.db".to_string(),
        }
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Upstream URLs. Overridable so tests and air-gapped deployments can point
/// at local fixtures or mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub plasma: String,
    pub magnetometer: String,
    pub plasma_daily: String,
    pub magnetometer_daily: String,
    pub scales: String,
    pub ovation: String,
    pub clouds: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            plasma: defaults::PLASMA_URL.to_string(),
            magnetometer: defaults::MAGNETOMETER_URL.to_string(),
            plasma_daily: defaults::PLASMA_DAILY_URL.to_string(),
            magnetometer_daily: defaults::MAGNETOMETER_DAILY_URL.to_string(),
            scales: defaults::SCALES_URL.to_string(),
            ovation: defaults::OVATION_URL.to_string(),
            clouds: defaults::CLOUD_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(WatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_latitude_rejected() {
        let mut cfg = WatchConfig::default();
        cfg.observer.latitude = 95.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let mut cfg = WatchConfig::default();
        cfg.alerts.cooldown_minutes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: WatchConfig = toml::from_str(
            r#"
            [observer]
            latitude = 59.9
            longitude = 10.7
            timezone = "Europe/Oslo"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.observer.latitude, 59.9);
        assert_eq!(cfg.alerts.cooldown_minutes, 60);
        assert!(!cfg.smtp.is_configured());
    }

    #[test]
    fn test_smtp_configured_requires_all_core_fields() {
        let smtp = SmtpConfig {
            server: Some("smtp.example.com".to_string()),
            port: Some(587),
            tls: SmtpTls::Starttls,
            username: Some("user".to_string()),
            password: None,
            from: Some("watch@example.com".to_string()),
        };
        assert!(!smtp.is_configured());
    }
}
