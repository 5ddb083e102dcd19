//! KML/KMZ input.
//!
//! - [`archive`] pulls the KML document out of an uploaded `.kml` or `.kmz`.
//! - [`parser`] streams the document into surveyed points and boundary polygons.

pub mod archive;
pub mod parser;

pub use archive::{SourceKind, extract_kml};
pub use parser::parse_document;

use crate::geometry::{Area, Ring};

/// Name given to polygons whose placemark has none.
pub const UNKNOWN_BOUNDARY: &str = "UNKNOWN_BOUNDARY";

/// A `Point` placemark.
#[derive(Debug, Clone, PartialEq)]
pub struct KmlPoint {
    /// Placemark name (the homepass identifier), trimmed.
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// ExtendedData fields in document order, one entry per name.
    pub extended: Vec<(String, Option<String>)>,
}

/// A named polygon from a `Polygon` placemark.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub ring: Ring,
}

impl Area for Boundary {
    fn name(&self) -> &str {
        &self.name
    }

    fn ring(&self) -> &Ring {
        &self.ring
    }
}

/// Everything read from one KML document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlDocument {
    pub points: Vec<KmlPoint>,
    pub boundaries: Vec<Boundary>,
}
