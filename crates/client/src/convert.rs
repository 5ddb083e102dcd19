//! Upload to CSV conversion.

use std::time::Instant;

use kmz2csv_core::Error;
use serde::Serialize;

use crate::export::{ExportRow, write_csv};
use crate::geocoder::{AddressLookup, CachedGeocoder, LookupSource};
use crate::geometry::assign_boundary;
use crate::kml::{extract_kml, parse_document};

/// Fallback download name when the upload name yields nothing usable.
pub const DEFAULT_OUTPUT_NAME: &str = "output.csv";

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { filename: filename.into(), bytes: bytes.into() }
    }

    /// Download name for the converted file: the upload stem plus `.csv`.
    pub fn csv_filename(&self) -> String {
        csv_filename(&self.filename)
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    /// Resolve a street name for every point.
    pub geocode: bool,
}

/// Counters describing one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub points: usize,
    pub boundaries: usize,
    /// Points that fell inside some boundary.
    pub assigned: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    /// Points left without a street because the lookup failed or was skipped.
    pub failed: usize,
    /// Upstream refused us mid-conversion; remaining misses were not queried.
    pub upstream_blocked: bool,
}

/// Finished conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub csv: Vec<u8>,
    pub report: ConversionReport,
}

/// Runs the extract, parse, assign, geocode, export pipeline.
#[derive(Debug, Clone)]
pub struct Converter<L> {
    geocoder: CachedGeocoder<L>,
    max_kml_bytes: usize,
}

impl<L: AddressLookup> Converter<L> {
    pub fn new(geocoder: CachedGeocoder<L>, max_kml_bytes: usize) -> Self {
        Self { geocoder, max_kml_bytes }
    }

    /// Convert one upload.
    ///
    /// # Errors
    ///
    /// Fails on unsupported or unreadable input and when the document holds
    /// no points. Geocoding failures never fail the conversion; the affected
    /// rows get an empty street.
    pub async fn convert(&self, upload: &Upload, options: ConvertOptions) -> Result<Conversion, Error> {
        let start = Instant::now();

        let kml = extract_kml(&upload.bytes, &upload.filename, self.max_kml_bytes)?;
        let doc = parse_document(&kml)?;

        if doc.points.is_empty() {
            return Err(Error::InvalidInput("no Point placemarks found in file".into()));
        }

        let mut report =
            ConversionReport { points: doc.points.len(), boundaries: doc.boundaries.len(), ..Default::default() };

        let mut rows = Vec::with_capacity(doc.points.len());
        for point in doc.points {
            let boundary = assign_boundary(point.lat, point.lon, &doc.boundaries).map(str::to_string);
            if boundary.is_some() {
                report.assigned += 1;
            }
            rows.push(ExportRow { point, boundary, street: None });
        }

        if options.geocode {
            self.resolve_streets(&mut rows, &mut report).await;
        }

        let csv = write_csv(&rows, options.geocode)?;

        tracing::info!(
            file = %upload.filename,
            points = report.points,
            boundaries = report.boundaries,
            assigned = report.assigned,
            geocode = options.geocode,
            cache_hits = report.cache_hits,
            fetched = report.fetched,
            failed = report.failed,
            upstream_blocked = report.upstream_blocked,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "conversion completed"
        );

        Ok(Conversion { csv, report })
    }

    /// Fill in streets one point at a time.
    ///
    /// Once upstream refuses us, only cache hits are used for the rest.
    async fn resolve_streets(&self, rows: &mut [ExportRow], report: &mut ConversionReport) {
        for row in rows.iter_mut() {
            let (lat, lon) = (row.point.lat, row.point.lon);

            let result = if report.upstream_blocked {
                self.geocoder.cached_street_name(lat, lon).await
            } else {
                self.geocoder.street_name(lat, lon).await.map(Some)
            };

            match result {
                Ok(Some(lookup)) => {
                    match lookup.source {
                        LookupSource::Cache => report.cache_hits += 1,
                        LookupSource::Upstream => report.fetched += 1,
                    }
                    row.street = lookup.road;
                }
                Ok(None) => report.failed += 1,
                Err(e) => {
                    report.failed += 1;
                    if e.is_upstream_refusal() && !report.upstream_blocked {
                        report.upstream_blocked = true;
                        tracing::error!(error = %e, "upstream refused geocoding, skipping remaining lookups");
                    } else {
                        tracing::warn!(
                            homepass = row.point.name.as_deref().unwrap_or("-"),
                            lat,
                            lon,
                            error = %e,
                            "street lookup failed"
                        );
                    }
                }
            }
        }
    }
}

/// `<stem>.csv` for an upload name, with path parts and unsafe characters
/// removed.
pub fn csv_filename(upload_name: &str) -> String {
    let base = upload_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c == '.' || c == ' ' || c == '_');

    if cleaned.is_empty() { DEFAULT_OUTPUT_NAME.to_string() } else { format!("{cleaned}.csv") }
}
