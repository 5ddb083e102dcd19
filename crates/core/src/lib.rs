//! Core types and shared functionality for kmz2csv.
//!
//! This crate provides:
//! - Geocode cache with SQLite backend
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CoordKey, GeocacheStats, GeocodeEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
