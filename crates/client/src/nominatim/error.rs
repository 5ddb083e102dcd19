//! Nominatim client error types.

use std::sync::Arc;

/// Errors from the Nominatim reverse-geocoding client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NominatimError {
    /// Coordinate outside the WGS84 range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Refused by the server (403). Nominatim answers this way to clients
    /// that violate its usage policy or send no identifying User-Agent.
    #[error("blocked by Nominatim: check the User-Agent and request rate")]
    Blocked,

    /// Rate limited by Nominatim.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl NominatimError {
    /// Whether retrying the same request later can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NominatimError::RateLimited | NominatimError::Timeout | NominatimError::Network(_) => true,
            NominatimError::HttpError { status } => *status >= 500 || *status == 408,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for NominatimError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { NominatimError::Timeout } else { NominatimError::Network(Arc::new(err)) }
    }
}

impl From<NominatimError> for kmz2csv_core::Error {
    fn from(err: NominatimError) -> Self {
        match err {
            NominatimError::InvalidCoordinate(msg) => kmz2csv_core::Error::InvalidInput(msg),
            NominatimError::Blocked => kmz2csv_core::Error::GeocodeBlocked(err.to_string()),
            NominatimError::RateLimited => kmz2csv_core::Error::GeocodeRateLimited(err.to_string()),
            _ => kmz2csv_core::Error::Geocode(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NominatimError::HttpError { status: 502 };
        assert!(err.to_string().contains("502"));

        let err = NominatimError::Blocked;
        assert!(err.to_string().contains("User-Agent"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(NominatimError::RateLimited.is_transient());
        assert!(NominatimError::Timeout.is_transient());
        assert!(NominatimError::HttpError { status: 503 }.is_transient());
        assert!(NominatimError::HttpError { status: 408 }.is_transient());
        assert!(!NominatimError::HttpError { status: 404 }.is_transient());
        assert!(!NominatimError::Blocked.is_transient());
        assert!(!NominatimError::Parse("eof".into()).is_transient());
    }

    #[test]
    fn test_into_core_error() {
        let err: kmz2csv_core::Error = NominatimError::Blocked.into();
        assert!(err.is_upstream_refusal());

        let err: kmz2csv_core::Error = NominatimError::RateLimited.into();
        assert!(matches!(err, kmz2csv_core::Error::GeocodeRateLimited(_)));

        let err: kmz2csv_core::Error = NominatimError::Timeout.into();
        assert!(matches!(err, kmz2csv_core::Error::Geocode(_)));
    }
}
