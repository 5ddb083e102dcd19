//! Streaming KML parser.
//!
//! Elements are matched by local name so documents with or without the
//! `http://www.opengis.net/kml/2.2` namespace (or a prefix for it) read the
//! same way. Only the parts needed for export are kept: placemark names,
//! the first point, the outer ring of the first polygon, and ExtendedData.

use std::borrow::Cow;
use std::fmt::Display;

use kmz2csv_core::Error;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::geometry::Ring;
use crate::kml::{Boundary, KmlDocument, KmlPoint, UNKNOWN_BOUNDARY};

/// Per-placemark accumulator.
#[derive(Debug, Default)]
struct PlacemarkState {
    name: Option<String>,
    point: Option<String>,
    outer_ring: Option<String>,
    extended: Vec<(String, Option<String>)>,
    data_name: Option<String>,
    data_value: Option<String>,
    simple_name: Option<String>,
}

impl PlacemarkState {
    /// Record a field; a repeated name keeps its first position.
    fn set_field(&mut self, name: String, value: Option<String>) {
        match self.extended.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.extended.push((name, value)),
        }
    }

    fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => format!("'{name}'"),
            None => format!("#{index}"),
        }
    }
}

/// Parse a KML document into points and boundaries.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for malformed XML and for coordinates that
/// are not numbers.
pub fn parse_document(kml: &[u8]) -> Result<KmlDocument, Error> {
    let mut reader = Reader::from_reader(kml);
    reader.config_mut().trim_text(true);

    let mut doc = KmlDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut placemark: Option<PlacemarkState> = None;
    let mut placemark_index = 0usize;
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                saw_root = true;
                let local = local_name(e)?;
                if local == "Placemark" {
                    placemark_index += 1;
                    placemark = Some(PlacemarkState::default());
                } else if let Some(state) = placemark.as_mut() {
                    match local.as_str() {
                        "Data" => {
                            state.data_name = attribute(e, "name")?;
                            state.data_value = None;
                        }
                        "SimpleData" => state.simple_name = attribute(e, "name")?,
                        _ => {}
                    }
                }
                stack.push(local);
                text.clear();
            }

            Ok(Event::Empty(ref e)) => {
                saw_root = true;
                let local = local_name(e)?;
                if let Some(state) = placemark.as_mut() {
                    match local.as_str() {
                        "Data" => {
                            if let Some(name) = attribute(e, "name")? {
                                state.set_field(name, None);
                            }
                        }
                        "SimpleData" => {
                            if let Some(name) = attribute(e, "name")? {
                                state.set_field(name, Some(String::new()));
                            }
                        }
                        _ => {}
                    }
                }
            }

            Ok(Event::Text(e)) => {
                let chunk = e.unescape().map_err(invalid_kml)?;
                text.push_str(&chunk);
            }

            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                text.push_str(&String::from_utf8_lossy(&raw));
            }

            Ok(Event::End(_)) => {
                let Some(local) = stack.pop() else {
                    return Err(invalid_kml("unexpected closing tag"));
                };
                let content = std::mem::take(&mut text);

                if local == "Placemark" {
                    if let Some(state) = placemark.take() {
                        finish_placemark(state, placemark_index, &mut doc)?;
                    }
                    continue;
                }

                if let Some(state) = placemark.as_mut() {
                    close_element(state, &local, &stack, content);
                }
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(invalid_kml(format!("at byte {}: {e}", reader.buffer_position())));
            }

            _ => {}
        }
    }

    if !saw_root {
        return Err(invalid_kml("document has no root element"));
    }
    if let Some(open) = stack.last() {
        return Err(invalid_kml(format!("unexpected end of document inside <{open}>")));
    }

    tracing::debug!(points = doc.points.len(), boundaries = doc.boundaries.len(), "parsed KML document");
    Ok(doc)
}

/// Apply the text of a closing element inside a placemark.
///
/// `ancestors` no longer contains the element itself.
fn close_element(state: &mut PlacemarkState, local: &str, ancestors: &[String], content: String) {
    let parent = ancestors.last().map(String::as_str);
    let within = |name: &str| ancestors.iter().any(|a| a == name);

    match local {
        "name" if parent == Some("Placemark") => {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                state.name = Some(trimmed.to_string());
            }
        }
        "coordinates" if within("Point") && state.point.is_none() => {
            state.point = Some(content);
        }
        "coordinates"
            if within("Polygon") && within("outerBoundaryIs") && within("LinearRing") && state.outer_ring.is_none() =>
        {
            state.outer_ring = Some(content);
        }
        "value" if parent == Some("Data") => {
            state.data_value = Some(content);
        }
        "Data" => {
            if let Some(name) = state.data_name.take() {
                let value = state.data_value.take();
                state.set_field(name, value);
            }
        }
        "SimpleData" => {
            if let Some(name) = state.simple_name.take() {
                state.set_field(name, Some(content));
            }
        }
        _ => {}
    }
}

fn finish_placemark(state: PlacemarkState, index: usize, doc: &mut KmlDocument) -> Result<(), Error> {
    let label = state.label(index);

    if let Some(coords) = state.point.as_deref()
        && let Some(first) = coords.split_whitespace().next()
    {
        let (lon, lat) = parse_tuple(first).map_err(|reason| {
            Error::InvalidInput(format!("placemark {label}: invalid point coordinates '{first}': {reason}"))
        })?;
        doc.points.push(KmlPoint { name: state.name.clone(), lat, lon, extended: state.extended.clone() });
    }

    if let Some(coords) = state.outer_ring.as_deref()
        && !coords.trim().is_empty()
    {
        let mut vertices = Vec::new();
        for token in coords.split_whitespace() {
            let vertex = parse_tuple(token).map_err(|reason| {
                Error::InvalidInput(format!("placemark {label}: invalid polygon coordinates '{token}': {reason}"))
            })?;
            vertices.push(vertex);
        }

        match Ring::new(vertices) {
            Some(ring) => {
                let name = state.name.unwrap_or_else(|| UNKNOWN_BOUNDARY.to_string());
                doc.boundaries.push(Boundary { name, ring });
            }
            None => tracing::warn!(placemark = %label, "skipping polygon with fewer than 3 distinct vertices"),
        }
    }

    Ok(())
}

/// Parse `lon,lat[,alt]` into `(lon, lat)`.
fn parse_tuple(token: &str) -> Result<(f64, f64), String> {
    let mut parts = token.split(',');
    let lon = parts.next().ok_or("missing longitude")?;
    let lat = parts.next().ok_or("missing latitude")?;
    let lon: f64 = lon.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    if !lon.is_finite() || !lat.is_finite() {
        return Err("not a finite number".into());
    }
    Ok((lon, lat))
}

fn local_name(e: &BytesStart<'_>) -> Result<String, Error> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|e| invalid_kml(format!("invalid UTF-8 in element name: {e}")))
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, Error> {
    let Some(attr) = e.try_get_attribute(name).map_err(invalid_kml)? else {
        return Ok(None);
    };
    let value: Cow<'_, str> = attr.unescape_value().map_err(invalid_kml)?;
    Ok(Some(value.into_owned()))
}

fn invalid_kml(reason: impl Display) -> Error {
    Error::InvalidInput(format!("invalid KML: {reason}"))
}
