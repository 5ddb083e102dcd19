//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// Nominatim's public usage policy allows at most one request per second.
const POLICY_MIN_INTERVAL_SEC: f64 = 1.0;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `throttle_sec` is negative, not finite, or above 60 seconds
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `nominatim_url` is not an http(s) URL
    /// - `max_upload_bytes` is 0 or exceeds 512MB
    /// - `coord_precision` exceeds 7 digits
    /// - `zoom` exceeds 18
    /// - `max_retries` exceeds 10
    /// - `bind_addr` is not a socket address
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.throttle_sec.is_finite() || self.throttle_sec < 0.0 {
            return Err(ConfigError::Invalid {
                field: "throttle_sec".into(),
                reason: "must be a non-negative number of seconds".into(),
            });
        }
        if self.throttle_sec > 60.0 {
            return Err(ConfigError::Invalid { field: "throttle_sec".into(), reason: "must not exceed 60 seconds".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !(self.nominatim_url.starts_with("http://") || self.nominatim_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "nominatim_url".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_upload_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_upload_bytes > 512 * 1024 * 1024 {
            return Err(ConfigError::Invalid {
                field: "max_upload_bytes".into(),
                reason: "must not exceed 512MB".into(),
            });
        }

        if self.coord_precision > 7 {
            return Err(ConfigError::Invalid {
                field: "coord_precision".into(),
                reason: "must be between 0 and 7 digits".into(),
            });
        }

        if self.zoom > 18 {
            return Err(ConfigError::Invalid { field: "zoom".into(), reason: "must be between 0 and 18".into() });
        }

        if self.max_retries > 10 {
            return Err(ConfigError::Invalid { field: "max_retries".into(), reason: "must not exceed 10".into() });
        }

        self.socket_addr()?;

        if self.throttle_sec < POLICY_MIN_INTERVAL_SEC && self.nominatim_url.contains("nominatim.openstreetmap.org") {
            tracing::warn!(
                throttle_sec = self.throttle_sec,
                "throttle is below one second; the public Nominatim instance may block this client"
            );
        }

        if self.user_agent.contains("your-email@example.com") {
            tracing::warn!("user_agent still carries the placeholder contact; set NOMINATIM_USER_AGENT");
        }

        Ok(())
    }
}
