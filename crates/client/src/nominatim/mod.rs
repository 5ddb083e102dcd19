//! Nominatim reverse-geocoding client.
//!
//! Provides a client for the Nominatim `/reverse` endpoint with throttling,
//! retry, and response normalization.
//!
//! ### Usage policy
//!
//! - **Endpoint**: `{base_url}/reverse?format=jsonv2&addressdetails=1`
//! - **Identification**: every request carries the configured `User-Agent`.
//! - **Rate Limiting**:
//!   - One shared limiter per client; clones share it.
//!   - Default 1.1s between request starts (public instance allows 1/s).
//!   - Retries on 429, timeouts and transient 5xx with backoff.
//! - **Normalization**: converts the upstream body into [`ReverseResponse`].

pub mod error;
pub mod request;
pub mod response;

pub use error::NominatimError;
pub use request::ReverseRequest;
pub use response::{Address, ReverseResponse};

use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::retry::{RetryConfig, with_retry};
use kmz2csv_core::AppConfig;

/// Default base URL for the public Nominatim instance.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "kmz2csv/1.0 (contact: your-email@example.com)";

/// Default interval between request starts.
const DEFAULT_THROTTLE: Duration = Duration::from_millis(1100);

/// Nominatim client configuration.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL (default: https://nominatim.openstreetmap.org).
    pub base_url: String,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User-agent string identifying this deployment.
    pub user_agent: String,
    /// Minimum interval between two requests (default: 1.1s).
    pub throttle: Duration,
    /// Detail level for reverse lookups (default: 18).
    pub zoom: u8,
    /// Preferred response language.
    pub accept_language: Option<String>,
    /// Backoff for transient failures.
    pub retry: RetryConfig,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            throttle: DEFAULT_THROTTLE,
            zoom: 18,
            accept_language: None,
            retry: RetryConfig::default(),
        }
    }
}

impl From<&AppConfig> for NominatimConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            throttle: config.throttle(),
            zoom: config.zoom,
            accept_language: config.accept_language.clone(),
            retry: RetryConfig::with_max_retries(config.max_retries),
        }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: Mutex::new(None), min_interval }
    }

    /// Acquire permission to make a request, waiting if necessary.
    ///
    /// The lock is held across the wait, so concurrent callers queue up
    /// and leave one interval apart.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Nominatim reverse-geocoding client.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    config: NominatimConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl NominatimClient {
    /// Create a new client with the given configuration.
    pub fn new(config: NominatimConfig) -> Result<Self, NominatimError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| NominatimError::Network(Arc::new(e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(config.throttle));
        Ok(Self { http, config, rate_limiter })
    }

    /// Create a client from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, NominatimError> {
        Self::new(NominatimConfig::from(config))
    }

    /// Reverse-geocode one coordinate.
    ///
    /// Each attempt, including retries, waits its turn at the rate limiter.
    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<ReverseResponse, NominatimError> {
        let mut req = ReverseRequest::new(lat, lon, self.config.zoom);
        req.accept_language = self.config.accept_language.clone();
        req.validate()?;

        with_retry(&self.config.retry, NominatimError::is_transient, || self.reverse_once(&req)).await
    }

    async fn reverse_once(&self, req: &ReverseRequest) -> Result<ReverseResponse, NominatimError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let url = format!("{}/reverse", self.config.base_url);

        tracing::debug!(lat = req.lat, lon = req.lon, "querying Nominatim");

        let http_response = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(req)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(status = status.as_u16(), "Nominatim response status");

        if status == 403 {
            return Err(NominatimError::Blocked);
        }

        if status == 429 {
            return Err(NominatimError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(NominatimError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let response = ReverseResponse::from_body(&bytes)?;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            road = response.road.as_deref().unwrap_or("-"),
            "reverse lookup completed"
        );

        Ok(response)
    }
}
