//! Quantized coordinate keys.
//!
//! Nearby points collapse onto the same key so they share one upstream
//! lookup. At the default five fractional digits a key cell is about 1.1m.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Cache key for a geocode entry.
///
/// Both parts are fixed-precision decimal strings, e.g. `-6.20000`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordKey {
    pub lat: String,
    pub lon: String,
}

impl CoordKey {
    /// Quantize a coordinate pair to `precision` fractional digits.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if either value is not finite or lies
    /// outside the WGS84 range.
    pub fn quantize(lat: f64, lon: f64, precision: u8) -> Result<Self, Error> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(Error::InvalidInput(format!("latitude out of range: {lat}")));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidInput(format!("longitude out of range: {lon}")));
        }

        Ok(Self { lat: format_fixed(lat, precision), lon: format_fixed(lon, precision) })
    }
}

impl std::fmt::Display for CoordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

fn format_fixed(value: f64, precision: u8) -> String {
    let rendered = format!("{:.*}", usize::from(precision), value);
    // -0.00000 and 0.00000 are the same cell.
    match rendered.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => rendered,
    }
}
