//! SQLite-backed reverse-geocode cache.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Quantized coordinate keys
//! - Automatic schema migrations (adopting pre-existing cache files)
//! - WAL mode for concurrent access
//! - Purge strategies (age, unresolved, all)

pub mod connection;
pub mod geocache;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use geocache::{GeocacheStats, GeocodeEntry};
pub use key::CoordKey;
