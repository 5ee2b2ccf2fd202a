#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Engine configuration.
//!
//! Defaults are baked into the binary from `config/default.toml` via
//! [`include_str!`]. [`EngineConfig::load`] layers, in order:
//!
//! 1. the TOML file named by `URBAN_GUARDIAN_CONFIG`, if set (missing keys
//!    keep their defaults);
//! 2. `URBAN_GUARDIAN_CLUSTER_RADIUS` and `URBAN_GUARDIAN_DEBOUNCE_MS`;
//!
//! and then validates the result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use urban_guardian_alerts::{
    AlertSession, GeolocationRetryPolicy, NOTIFY_RADIUS_KM, SelfEchoTracker,
    echo::{DEFAULT_ECHO_CAPACITY, DEFAULT_ECHO_TTL_SECS},
    locate::{DEFAULT_BACKOFF, DEFAULT_INITIAL_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_STEP},
};
use urban_guardian_cluster::{
    ClusteringStrategy, DEFAULT_CLUSTER_RADIUS, DEFAULT_HOTSPOT_LIMIT, StrategyKind,
};

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "URBAN_GUARDIAN_CONFIG";

/// Environment override for `clustering.radius`.
pub const CLUSTER_RADIUS_ENV: &str = "URBAN_GUARDIAN_CLUSTER_RADIUS";

/// Environment override for `session.debounce_ms`.
pub const DEBOUNCE_MS_ENV: &str = "URBAN_GUARDIAN_DEBOUNCE_MS";

/// Default debounce window for recomputes.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Longest accepted self-echo TTL.
pub const MAX_ECHO_TTL_SECS: u64 = 3600;

/// Most geolocation attempts accepted.
pub const MAX_GEOLOCATION_ATTEMPTS: u32 = 10;

/// Longest accepted geolocation timeout, timeout step or backoff.
pub const MAX_GEOLOCATION_MS: u64 = 600_000;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`EngineConfig`].
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or an override could not be parsed.
    #[error("Invalid config value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// `[clustering]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Planar radius in degrees.
    pub radius: f64,
    /// How many hotspots to report.
    pub hotspot_limit: usize,
    pub strategy: StrategyKind,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CLUSTER_RADIUS,
            hotspot_limit: DEFAULT_HOTSPOT_LIMIT,
            strategy: StrategyKind::default(),
        }
    }
}

/// `[alerts]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub notify_radius_km: f64,
    /// Maximum pending self-originated changes.
    pub echo_capacity: usize,
    /// Seconds a self-originated mark stays valid.
    pub echo_ttl_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            notify_radius_km: NOTIFY_RADIUS_KM,
            echo_capacity: DEFAULT_ECHO_CAPACITY,
            echo_ttl_secs: DEFAULT_ECHO_TTL_SECS.unsigned_abs(),
        }
    }
}

/// `[session]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bursts of events within this window share one recompute.
    pub debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// `[geolocation]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Total position attempts, including the first.
    pub max_attempts: u32,
    /// Timeout of the first attempt.
    pub initial_timeout_ms: u64,
    /// Timeout added on every retry.
    pub timeout_step_ms: u64,
    /// Base delay before a retry, doubled each time.
    pub backoff_ms: u64,
    /// Whether the first attempt asks for a high-accuracy fix.
    pub high_accuracy: bool,
}

impl Default for GeolocationConfig {
    #[allow(clippy::cast_possible_truncation)]
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_timeout_ms: DEFAULT_INITIAL_TIMEOUT.as_millis() as u64,
            timeout_step_ms: DEFAULT_TIMEOUT_STEP.as_millis() as u64,
            backoff_ms: DEFAULT_BACKOFF.as_millis() as u64,
            high_accuracy: true,
        }
    }
}

/// All engine settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub clustering: ClusteringConfig,
    pub alerts: AlertsConfig,
    pub session: SessionConfig,
    pub geolocation: GeolocationConfig,
}

impl EngineConfig {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if `URBAN_GUARDIAN_CONFIG` names an unreadable
    ///   file.
    /// * [`ConfigError::Parse`] if that file is not valid TOML.
    /// * [`ConfigError::InvalidValue`] if an override is unparseable or the
    ///   final config fails [`Self::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => Self::from_toml_str(DEFAULT_CONFIG)?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        log::debug!("Loaded config: {config:?}");
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if the file cannot be read.
    /// * [`ConfigError::Parse`] if it is not valid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses a TOML document. Missing sections and keys keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Parse`] if the document is not valid TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(contents)?)
    }

    /// Applies single-value overrides looked up by variable name.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidValue`] if a present value does not parse.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(CLUSTER_RADIUS_ENV) {
            self.clustering.radius = value
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::invalid(CLUSTER_RADIUS_ENV, format!("{value:?}: {e}")))?;
            log::debug!("{CLUSTER_RADIUS_ENV} override: {}", self.clustering.radius);
        }
        if let Some(value) = lookup(DEBOUNCE_MS_ENV) {
            self.session.debounce_ms = value
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid(DEBOUNCE_MS_ENV, format!("{value:?}: {e}")))?;
            log::debug!("{DEBOUNCE_MS_ENV} override: {}", self.session.debounce_ms);
        }
        Ok(())
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radius = self.clustering.radius;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConfigError::invalid(
                "clustering.radius",
                format!("must be a positive number, got {radius}"),
            ));
        }
        let notify = self.alerts.notify_radius_km;
        if !notify.is_finite() || notify <= 0.0 {
            return Err(ConfigError::invalid(
                "alerts.notify_radius_km",
                format!("must be a positive number, got {notify}"),
            ));
        }
        if self.alerts.echo_capacity == 0 {
            return Err(ConfigError::invalid("alerts.echo_capacity", "must be at least 1"));
        }
        if self.alerts.echo_ttl_secs == 0 || self.alerts.echo_ttl_secs > MAX_ECHO_TTL_SECS {
            return Err(ConfigError::invalid(
                "alerts.echo_ttl_secs",
                format!("must be between 1 and {MAX_ECHO_TTL_SECS}"),
            ));
        }
        let geo = &self.geolocation;
        if geo.max_attempts == 0 || geo.max_attempts > MAX_GEOLOCATION_ATTEMPTS {
            return Err(ConfigError::invalid(
                "geolocation.max_attempts",
                format!("must be between 1 and {MAX_GEOLOCATION_ATTEMPTS}"),
            ));
        }
        if geo.initial_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "geolocation.initial_timeout_ms",
                "must be positive",
            ));
        }
        for (key, value) in [
            ("geolocation.initial_timeout_ms", geo.initial_timeout_ms),
            ("geolocation.timeout_step_ms", geo.timeout_step_ms),
            ("geolocation.backoff_ms", geo.backoff_ms),
        ] {
            if value > MAX_GEOLOCATION_MS {
                return Err(ConfigError::invalid(
                    key,
                    format!("must be at most {MAX_GEOLOCATION_MS}"),
                ));
            }
        }
        Ok(())
    }

    /// The configured clustering strategy.
    #[must_use]
    pub fn strategy(&self) -> &'static dyn ClusteringStrategy {
        self.clustering.strategy.strategy()
    }

    /// The recompute debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.session.debounce_ms)
    }

    /// Builds a self-echo tracker with the configured bounds.
    #[must_use]
    pub fn echo_tracker(&self) -> SelfEchoTracker {
        let ttl_secs = i64::try_from(self.alerts.echo_ttl_secs).unwrap_or(DEFAULT_ECHO_TTL_SECS);
        SelfEchoTracker::new(self.alerts.echo_capacity, chrono::Duration::seconds(ttl_secs))
    }

    /// Builds a disabled alert session with the configured radius.
    #[must_use]
    pub fn alert_session(&self) -> AlertSession {
        AlertSession::new(self.alerts.notify_radius_km, self.echo_tracker())
    }

    /// Builds the geolocation retry schedule.
    #[must_use]
    pub const fn retry_policy(&self) -> GeolocationRetryPolicy {
        GeolocationRetryPolicy {
            max_attempts: self.geolocation.max_attempts,
            high_accuracy: self.geolocation.high_accuracy,
            initial_timeout: Duration::from_millis(self.geolocation.initial_timeout_ms),
            timeout_step: Duration::from_millis(self.geolocation.timeout_step_ms),
            backoff: Duration::from_millis(self.geolocation.backoff_ms),
        }
    }
}
