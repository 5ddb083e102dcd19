//! Structured errors for the HTTP API.
//!
//! Every failure is answered with `{"detail": "..."}` and a status derived
//! from the error code.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kmz2csv_core::Error;
use serde_json::json;

/// Error returned by handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) | Error::UnsupportedFile(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Geocode(_) | Error::GeocodeRateLimited(_) | Error::GeocodeBlocked(_) => StatusCode::BAD_GATEWAY,
            Error::Database(_) | Error::MigrationFailed(_) | Error::Export(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Internal failures are not spelled out.
    fn detail(&self) -> String {
        match &self.0 {
            Error::InvalidInput(msg)
            | Error::UnsupportedFile(msg)
            | Error::PayloadTooLarge(msg)
            | Error::Geocode(msg)
            | Error::GeocodeRateLimited(msg)
            | Error::GeocodeBlocked(msg) => msg.clone(),
            _ => "internal server error".to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let detail = err.body_text();
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError(Error::PayloadTooLarge(detail))
        } else {
            ApiError(Error::InvalidInput(format!("invalid upload: {detail}")))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError(Error::InvalidInput("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(Error::UnsupportedFile("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(Error::PayloadTooLarge("x".into())).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError(Error::GeocodeBlocked("x".into())).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError(Error::Export("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_detail_hidden() {
        assert_eq!(ApiError(Error::MigrationFailed("disk I/O error".into())).detail(), "internal server error");
        assert_eq!(ApiError(Error::InvalidInput("no Point".into())).detail(), "no Point");
    }
}
