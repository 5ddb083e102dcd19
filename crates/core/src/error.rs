//! Unified error types for kmz2csv.
//!
//! The display prefix is a stable error code; the HTTP layer maps each
//! variant to a status code.

use tokio_rusqlite::rusqlite;

/// Unified error types for kmz2csv.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (malformed KML, bad coordinates, empty document).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Uploaded file is neither KMZ nor KML.
    #[error("UNSUPPORTED_FILE: {0}")]
    UnsupportedFile(String),

    /// Upload or archive entry exceeds the configured limit.
    #[error("PAYLOAD_TOO_LARGE: {0}")]
    PayloadTooLarge(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Reverse geocoding failed (network, HTTP status, decode).
    #[error("GEOCODE_FAILED: {0}")]
    Geocode(String),

    /// Upstream kept answering 429 after all retries.
    #[error("GEOCODE_RATE_LIMITED: {0}")]
    GeocodeRateLimited(String),

    /// Upstream refused the client (usage policy, missing identification).
    #[error("GEOCODE_BLOCKED: {0}")]
    GeocodeBlocked(String),

    /// CSV output could not be produced.
    #[error("EXPORT_FAILED: {0}")]
    Export(String),

    /// Configuration could not be loaded or failed validation.
    #[error("CONFIG_ERROR: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error means upstream will refuse every further request.
    pub fn is_upstream_refusal(&self) -> bool {
        matches!(self, Error::GeocodeBlocked(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
