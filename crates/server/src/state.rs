//! Shared application state.

use std::sync::Arc;

use kmz2csv_client::{CachedGeocoder, Converter, NominatimClient};
use kmz2csv_core::{AppConfig, CacheDb, Error};

/// State handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter<NominatimClient>>,
    pub cache: CacheDb,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Open the cache and build the converter from configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let cache = CacheDb::open(&config.db_path).await?;
        let upstream = NominatimClient::from_app_config(config)?;
        Ok(Self::new(cache, upstream, config))
    }

    pub fn new(cache: CacheDb, upstream: NominatimClient, config: &AppConfig) -> Self {
        let geocoder = CachedGeocoder::new(cache.clone(), upstream, config.coord_precision);
        let converter = Converter::new(geocoder, config.max_upload_bytes);
        Self { converter: Arc::new(converter), cache, max_upload_bytes: config.max_upload_bytes }
    }
}
