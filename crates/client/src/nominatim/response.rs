//! Nominatim reverse response types and normalization.

use serde::{Deserialize, Serialize};

use crate::nominatim::NominatimError;

/// Raw `jsonv2` response from `GET /reverse`.
///
/// Points with nothing nearby (open sea) come back as `{"error": "..."}`
/// with status 200.
#[derive(Debug, Deserialize)]
pub struct NominatimApiResponse {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Broken-down address (`addressdetails=1`). Only the fields we read.
#[derive(Debug, Default, Deserialize)]
pub struct Address {
    pub road: Option<String>,
    pub residential: Option<String>,
    pub pedestrian: Option<String>,
}

impl Address {
    /// Street name: `road`, falling back to `residential`, then `pedestrian`.
    pub fn street(&self) -> Option<&str> {
        [&self.road, &self.residential, &self.pedestrian]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

/// Normalized reverse-geocode answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReverseResponse {
    /// Street name, if the location resolved to one.
    pub road: Option<String>,
    /// Upstream error message for "unable to geocode" answers.
    pub upstream_error: Option<String>,
    /// Response body as received, kept for the cache.
    pub raw_json: String,
}

impl ReverseResponse {
    /// Decode a response body.
    pub fn from_body(body: &[u8]) -> Result<Self, NominatimError> {
        let raw: NominatimApiResponse =
            serde_json::from_slice(body).map_err(|e| NominatimError::Parse(e.to_string()))?;

        Ok(Self {
            road: raw.address.as_ref().and_then(Address::street).map(str::to_string),
            upstream_error: raw.error,
            raw_json: String::from_utf8_lossy(body).into_owned(),
        })
    }
}
