//! `kmz2csv cache ...`

use anyhow::Result;
use kmz2csv_core::{AppConfig, CacheDb, CoordKey};

/// Which entries `cache purge` removes. Criteria add up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeCriteria {
    pub older_than_days: Option<i64>,
    pub unresolved: bool,
    pub all: bool,
}

pub async fn stats(config: &AppConfig) -> Result<()> {
    let cache = CacheDb::open(&config.db_path).await?;
    let stats = cache.geocache_stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn get(config: &AppConfig, lat: f64, lon: f64) -> Result<()> {
    let key = CoordKey::quantize(lat, lon, config.coord_precision)?;
    let cache = CacheDb::open(&config.db_path).await?;

    match cache.get_geocode(&key).await? {
        Some(entry) => {
            println!("{}", serde_json::to_string_pretty(&entry)?);
            Ok(())
        }
        None => anyhow::bail!("no cached entry for {key}"),
    }
}

pub async fn purge(config: &AppConfig, criteria: PurgeCriteria) -> Result<()> {
    let cache = CacheDb::open(&config.db_path).await?;
    let deleted = purge_with(&cache, criteria).await?;
    println!("deleted {deleted} entries");
    Ok(())
}

async fn purge_with(cache: &CacheDb, criteria: PurgeCriteria) -> Result<u64> {
    if criteria.all {
        return Ok(cache.clear_geocache().await?);
    }

    let mut deleted = 0;
    if let Some(days) = criteria.older_than_days {
        anyhow::ensure!(days >= 0, "--older-than-days must not be negative");
        deleted += cache.purge_geocache_older_than(days).await?;
    }
    if criteria.unresolved {
        deleted += cache.purge_unresolved_geocache().await?;
    }

    tracing::info!(deleted, "purged geocode cache");
    Ok(deleted)
}
