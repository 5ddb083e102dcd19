//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (KMZ2CSV_*)
//! 2. Deployment variables (GEOCACHE_DB, NOMINATIM_THROTTLE_SEC, NOMINATIM_USER_AGENT)
//! 3. TOML config file (if KMZ2CSV_CONFIG_FILE set)
//! 4. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Unprefixed variables understood for compatibility with existing deployments.
///
/// Each maps onto a field of [`AppConfig`].
const DEPLOYMENT_ENV: &[(&str, &str)] = &[
    ("GEOCACHE_DB", "db_path"),
    ("NOMINATIM_THROTTLE_SEC", "throttle_sec"),
    ("NOMINATIM_USER_AGENT", "user_agent"),
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (KMZ2CSV_*)
/// 2. Deployment variables (GEOCACHE_DB, NOMINATIM_*)
/// 3. TOML config file (if KMZ2CSV_CONFIG_FILE set)
/// 4. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite geocode cache.
    ///
    /// Set via GEOCACHE_DB or KMZ2CSV_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Minimum seconds between two outbound Nominatim requests.
    ///
    /// Set via NOMINATIM_THROTTLE_SEC or KMZ2CSV_THROTTLE_SEC.
    #[serde(default = "default_throttle_sec")]
    pub throttle_sec: f64,

    /// User-Agent sent to Nominatim. Their usage policy requires a
    /// descriptive identifier with contact information.
    ///
    /// Set via NOMINATIM_USER_AGENT or KMZ2CSV_USER_AGENT.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base URL of the Nominatim instance.
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Address the HTTP service listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted upload (and largest KML entry inside a KMZ).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Fractional digits kept when quantizing coordinates into cache keys.
    #[serde(default = "default_coord_precision")]
    pub coord_precision: u8,

    /// Nominatim zoom level (18 = building/street detail).
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Retries for transient upstream failures (timeouts, 429, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Preferred language for street names (Nominatim `accept-language`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("geocache.sqlite")
}

fn default_throttle_sec() -> f64 {
    1.1
}

fn default_user_agent() -> String {
    "kmz2csv/1.0 (contact: your-email@example.com)".into()
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

fn default_max_upload_bytes() -> usize {
    52_428_800 // 50MB
}

fn default_coord_precision() -> u8 {
    5
}

fn default_zoom() -> u8 {
    18
}

fn default_max_retries() -> u32 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            throttle_sec: default_throttle_sec(),
            user_agent: default_user_agent(),
            nominatim_url: default_nominatim_url(),
            timeout_ms: default_timeout_ms(),
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
            coord_precision: default_coord_precision(),
            zoom: default_zoom(),
            max_retries: default_max_retries(),
            accept_language: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Throttle interval as Duration.
    ///
    /// Only meaningful after [`AppConfig::validate`] has accepted the value.
    pub fn throttle(&self) -> Duration {
        Duration::from_secs_f64(self.throttle_sec)
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `bind_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid { field: "bind_addr".into(), reason: format!("{e}") })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("KMZ2CSV_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        let deployment_keys: Vec<&str> = DEPLOYMENT_ENV.iter().map(|(var, _)| *var).collect();
        figment = figment.merge(Env::raw().only(&deployment_keys).map(|key| {
            DEPLOYMENT_ENV
                .iter()
                .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                .map(|(_, field)| (*field).into())
                .unwrap_or_else(|| key.as_str().to_lowercase().into())
        }));

        figment = figment.merge(
            Env::prefixed("KMZ2CSV_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
