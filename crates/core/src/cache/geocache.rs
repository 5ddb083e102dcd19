//! Geocode cache operations.
//!
//! One row per quantized coordinate. A NULL `road` is a cached answer
//! ("no street here"), not a miss.

use super::connection::CacheDb;
use super::key::CoordKey;
use crate::Error;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached reverse-geocode answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeEntry {
    pub key: CoordKey,
    pub road: Option<String>,
    pub raw_json: Option<String>,
    /// RFC 3339 timestamp; absent for rows adopted from older cache files.
    pub fetched_at: Option<String>,
}

impl GeocodeEntry {
    /// Build an entry stamped with the current time.
    pub fn fetched_now(key: CoordKey, road: Option<String>, raw_json: Option<String>) -> Self {
        Self { key, road, raw_json, fetched_at: Some(Utc::now().to_rfc3339()) }
    }
}

/// Summary of the cache contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocacheStats {
    pub entries: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub oldest_fetched_at: Option<String>,
    pub newest_fetched_at: Option<String>,
}

impl CacheDb {
    /// Get a cached answer for a key.
    ///
    /// Returns None if the key has never been looked up.
    pub async fn get_geocode(&self, key: &CoordKey) -> Result<Option<GeocodeEntry>, Error> {
        let key = key.clone();
        self.conn
            .call(move |conn| -> Result<Option<GeocodeEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT road, raw_json, fetched_at FROM geocache WHERE lat_round = ?1 AND lon_round = ?2",
                )?;

                let result = stmt.query_row(params![key.lat, key.lon], |row| {
                    Ok((row.get::<_, Option<String>>(0)?, row.get(1)?, row.get(2)?))
                });

                match result {
                    Ok((road, raw_json, fetched_at)) => Ok(Some(GeocodeEntry { key, road, raw_json, fetched_at })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a cached answer.
    ///
    /// Uses UPSERT semantics: inserts if the key doesn't exist, updates all fields if it does.
    pub async fn put_geocode(&self, entry: &GeocodeEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO geocache (lat_round, lon_round, road, raw_json, fetched_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(lat_round, lon_round) DO UPDATE SET
                        road = excluded.road,
                        raw_json = excluded.raw_json,
                        fetched_at = excluded.fetched_at",
                    params![entry.key.lat, entry.key.lon, entry.road, entry.raw_json, entry.fetched_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Count entries and report the fetch-time range.
    pub async fn geocache_stats(&self) -> Result<GeocacheStats, Error> {
        self.conn
            .call(|conn| -> Result<GeocacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT COUNT(*), COUNT(road), MIN(fetched_at), MAX(fetched_at) FROM geocache",
                    [],
                    |row| {
                        let entries: i64 = row.get(0)?;
                        let resolved: i64 = row.get(1)?;
                        Ok(GeocacheStats {
                            entries: entries as u64,
                            resolved: resolved as u64,
                            unresolved: (entries - resolved) as u64,
                            oldest_fetched_at: row.get(2)?,
                            newest_fetched_at: row.get(3)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries fetched more than `days` days ago.
    ///
    /// Entries without a fetch time count as old. A cutoff before the earliest
    /// representable time only removes those. Returns the number of deleted entries.
    pub async fn purge_geocache_older_than(&self, days: i64) -> Result<u64, Error> {
        if days < 0 {
            return Err(Error::InvalidInput(format!("purge age must not be negative, got {days} days")));
        }
        let cutoff = Duration::try_days(days)
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .map(|cutoff| cutoff.to_rfc3339());

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = match cutoff {
                    Some(cutoff) => conn.execute(
                        "DELETE FROM geocache WHERE fetched_at IS NULL OR fetched_at < ?1",
                        params![cutoff],
                    )?,
                    None => conn.execute("DELETE FROM geocache WHERE fetched_at IS NULL", [])?,
                };
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries that resolved to no street, so they are looked up again.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_unresolved_geocache(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM geocache WHERE road IS NULL", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry.
    pub async fn clear_geocache(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM geocache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lat: f64, lon: f64) -> CoordKey {
        CoordKey::quantize(lat, lon, 5).unwrap()
    }

    fn entry(lat: f64, lon: f64, road: Option<&str>) -> GeocodeEntry {
        GeocodeEntry::fetched_now(key(lat, lon), road.map(str::to_string), Some("{}".to_string()))
    }

    async fn insert_with_fetched_at(db: &CacheDb, lat: f64, lon: f64, fetched_at: Option<String>) {
        let mut e = entry(lat, lon, Some("Jalan Lama"));
        e.fetched_at = fetched_at;
        db.put_geocode(&e).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_and_get_geocode() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let e = entry(-6.2, 106.816666, Some("Jalan Jenderal Sudirman"));

        db.put_geocode(&e).await.unwrap();

        let retrieved = db.get_geocode(&e.key).await.unwrap().unwrap();
        assert_eq!(retrieved, e);
    }

    #[tokio::test]
    async fn test_get_missing_geocode() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = db.get_geocode(&key(1.0, 1.0)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_null_road_is_a_hit() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let e = entry(-8.5, 115.2, None);
        db.put_geocode(&e).await.unwrap();

        let retrieved = db.get_geocode(&e.key).await.unwrap();
        assert!(matches!(retrieved, Some(GeocodeEntry { road: None, .. })));
    }

    #[tokio::test]
    async fn test_upsert_geocode() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_geocode(&entry(-6.2, 106.8, None)).await.unwrap();
        db.put_geocode(&entry(-6.2, 106.8, Some("Jalan Baru"))).await.unwrap();

        let retrieved = db.get_geocode(&key(-6.2, 106.8)).await.unwrap().unwrap();
        assert_eq!(retrieved.road.as_deref(), Some("Jalan Baru"));
        assert_eq!(db.geocache_stats().await.unwrap().entries, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.geocache_stats().await.unwrap(), GeocacheStats::default());

        db.put_geocode(&entry(1.0, 1.0, Some("A"))).await.unwrap();
        db.put_geocode(&entry(2.0, 2.0, Some("B"))).await.unwrap();
        db.put_geocode(&entry(3.0, 3.0, None)).await.unwrap();

        let stats = db.geocache_stats().await.unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.unresolved, 1);
        assert!(stats.oldest_fetched_at.is_some());
        assert!(stats.oldest_fetched_at <= stats.newest_fetched_at);
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = (Utc::now() - Duration::days(40)).to_rfc3339();
        insert_with_fetched_at(&db, 1.0, 1.0, Some(old)).await;
        insert_with_fetched_at(&db, 2.0, 2.0, None).await;
        db.put_geocode(&entry(3.0, 3.0, Some("Fresh"))).await.unwrap();

        let deleted = db.purge_geocache_older_than(30).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(db.get_geocode(&key(3.0, 3.0)).await.unwrap().is_some());
        assert!(db.get_geocode(&key(1.0, 1.0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_with_huge_age_keeps_dated_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        insert_with_fetched_at(&db, 1.0, 1.0, None).await;
        db.put_geocode(&entry(2.0, 2.0, Some("Jalan Asia Afrika"))).await.unwrap();

        let deleted = db.purge_geocache_older_than(1_000_000_000).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_geocode(&key(2.0, 2.0)).await.unwrap().is_some());

        assert_eq!(db.purge_geocache_older_than(i64::MAX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_rejects_negative_age() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let err = db.purge_geocache_older_than(-1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_purge_unresolved() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_geocode(&entry(1.0, 1.0, None)).await.unwrap();
        db.put_geocode(&entry(2.0, 2.0, Some("Jalan Thamrin"))).await.unwrap();

        let deleted = db.purge_unresolved_geocache().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_geocode(&key(1.0, 1.0)).await.unwrap().is_none());
        assert!(db.get_geocode(&key(2.0, 2.0)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_geocode(&entry(1.0, 1.0, None)).await.unwrap();
        db.put_geocode(&entry(2.0, 2.0, Some("B"))).await.unwrap();

        assert_eq!(db.clear_geocache().await.unwrap(), 2);
        assert_eq!(db.geocache_stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geocache.sqlite");
        let e = entry(-7.25, 112.75, Some("Jalan Tunjungan"));

        {
            let db = CacheDb::open(&path).await.unwrap();
            db.put_geocode(&e).await.unwrap();
        }

        let db = CacheDb::open(&path).await.unwrap();
        let retrieved = db.get_geocode(&e.key).await.unwrap().unwrap();
        assert_eq!(retrieved.road.as_deref(), Some("Jalan Tunjungan"));
    }
}
