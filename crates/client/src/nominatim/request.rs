//! Nominatim reverse request parameters and validation.

use serde::Serialize;

use crate::nominatim::NominatimError;

/// Query parameters for `GET /reverse`.
///
/// Based on the Nominatim API documentation:
/// https://nominatim.org/release-docs/latest/api/Reverse/
#[derive(Debug, Clone, Serialize)]
pub struct ReverseRequest {
    /// Latitude (WGS84).
    pub lat: f64,

    /// Longitude (WGS84).
    pub lon: f64,

    /// Detail level, 0 (country) to 18 (building).
    pub zoom: u8,

    /// Response format; always `jsonv2`.
    pub format: &'static str,

    /// Include the broken-down address (1) or not (0).
    pub addressdetails: u8,

    /// Preferred response language, e.g. "id" or "en".
    #[serde(rename = "accept-language", skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
}

impl ReverseRequest {
    /// Street-level request with address details.
    pub fn new(lat: f64, lon: f64, zoom: u8) -> Self {
        Self { lat, lon, zoom, format: "jsonv2", addressdetails: 1, accept_language: None }
    }

    /// Validate the request parameters.
    pub fn validate(&self) -> Result<(), NominatimError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(NominatimError::InvalidCoordinate(format!("latitude {}", self.lat)));
        }

        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(NominatimError::InvalidCoordinate(format!("longitude {}", self.lon)));
        }

        if self.zoom > 18 {
            return Err(NominatimError::InvalidCoordinate(format!("zoom {} (max 18)", self.zoom)));
        }

        Ok(())
    }
}
