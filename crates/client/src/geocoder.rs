//! Cache-first street lookup.
//!
//! [`CachedGeocoder`] answers from the SQLite geocode cache when the
//! quantized coordinate has been seen before and only falls through to the
//! upstream service on a miss. Successful upstream answers are written back,
//! including answers with no street; failures are not.

use async_trait::async_trait;
use kmz2csv_core::{CacheDb, CoordKey, Error, GeocodeEntry};

use crate::nominatim::{NominatimClient, NominatimError, ReverseResponse};

/// Reverse geocoding backend.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<ReverseResponse, NominatimError>;
}

#[async_trait]
impl AddressLookup for NominatimClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<ReverseResponse, NominatimError> {
        NominatimClient::reverse(self, lat, lon).await
    }
}

/// Where a street name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Cache,
    Upstream,
}

/// Result of one street lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub road: Option<String>,
    pub source: LookupSource,
}

/// Geocoder that consults the cache before the upstream service.
#[derive(Debug, Clone)]
pub struct CachedGeocoder<L> {
    cache: CacheDb,
    upstream: L,
    precision: u8,
}

impl<L: AddressLookup> CachedGeocoder<L> {
    pub fn new(cache: CacheDb, upstream: L, precision: u8) -> Self {
        Self { cache, upstream, precision }
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Street name at a coordinate.
    ///
    /// A cached row with no road is a valid answer and is returned as-is.
    /// Cache write failures are logged and do not fail the lookup.
    pub async fn street_name(&self, lat: f64, lon: f64) -> Result<Lookup, Error> {
        let key = CoordKey::quantize(lat, lon, self.precision)?;

        if let Some(lookup) = self.cached(&key).await? {
            return Ok(lookup);
        }

        tracing::debug!(key = %key, "geocode cache miss");
        let response = self.upstream.reverse(lat, lon).await?;

        if let Some(reason) = response.upstream_error.as_deref() {
            tracing::debug!(key = %key, reason, "upstream found nothing at location");
        }

        let entry = GeocodeEntry::fetched_now(key, response.road.clone(), Some(response.raw_json));
        if let Err(e) = self.cache.put_geocode(&entry).await {
            tracing::warn!(key = %entry.key, error = %e, "failed to write geocode cache entry");
        }

        Ok(Lookup { road: response.road, source: LookupSource::Upstream })
    }

    /// Street name from the cache alone; `None` on a miss.
    pub async fn cached_street_name(&self, lat: f64, lon: f64) -> Result<Option<Lookup>, Error> {
        let key = CoordKey::quantize(lat, lon, self.precision)?;
        self.cached(&key).await
    }

    async fn cached(&self, key: &CoordKey) -> Result<Option<Lookup>, Error> {
        let Some(entry) = self.cache.get_geocode(key).await? else {
            return Ok(None);
        };
        tracing::debug!(key = %key, road = entry.road.as_deref().unwrap_or("-"), "geocode cache hit");
        Ok(Some(Lookup { road: entry.road, source: LookupSource::Cache }))
    }
}
