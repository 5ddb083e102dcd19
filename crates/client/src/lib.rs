//! Conversion pipeline for kmz2csv.
//!
//! This crate provides KMZ/KML reading, boundary assignment, the Nominatim
//! reverse-geocoding client with its cache-first wrapper, and CSV export,
//! shared by the server and CLI.

pub mod convert;
pub mod export;
pub mod geocoder;
pub mod geometry;
pub mod kml;
pub mod nominatim;
pub mod retry;

pub use convert::{Conversion, ConversionReport, ConvertOptions, Converter, Upload, csv_filename};
pub use export::{ExportRow, write_csv};
pub use geocoder::{AddressLookup, CachedGeocoder, Lookup, LookupSource};
pub use geometry::{Ring, assign_boundary};
pub use kml::{Boundary, KmlDocument, KmlPoint, extract_kml, parse_document};
pub use nominatim::{NominatimClient, NominatimConfig, NominatimError, ReverseResponse};
pub use retry::{RetryConfig, with_retry};
