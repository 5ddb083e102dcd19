//! CSV output.
//!
//! Core columns come first (`homepass, lat, lon, [nama_jalan,] boundary`),
//! followed by every ExtendedData name in order of first appearance.

use kmz2csv_core::Error;

use crate::kml::KmlPoint;

pub const COL_HOMEPASS: &str = "homepass";
pub const COL_LAT: &str = "lat";
pub const COL_LON: &str = "lon";
pub const COL_STREET: &str = "nama_jalan";
pub const COL_BOUNDARY: &str = "boundary";

const CORE_COLUMNS: [&str; 5] = [COL_HOMEPASS, COL_LAT, COL_LON, COL_STREET, COL_BOUNDARY];

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub point: KmlPoint,
    pub boundary: Option<String>,
    /// Street name; only written when the street column is enabled.
    pub street: Option<String>,
}

/// Header for a set of rows.
pub fn columns(rows: &[ExportRow], with_street: bool) -> Vec<String> {
    let mut header: Vec<String> = [COL_HOMEPASS, COL_LAT, COL_LON]
        .into_iter()
        .chain(with_street.then_some(COL_STREET))
        .chain([COL_BOUNDARY])
        .map(str::to_string)
        .collect();

    let core_len = header.len();
    for row in rows {
        for (name, _) in &row.point.extended {
            if CORE_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if !header[core_len..].contains(name) {
                header.push(name.clone());
            }
        }
    }
    header
}

/// Render rows as UTF-8 CSV with a header line.
pub fn write_csv(rows: &[ExportRow], with_street: bool) -> Result<Vec<u8>, Error> {
    let header = columns(rows, with_street);
    let extra = &header[if with_street { 5 } else { 4 }..];

    let mut writer = csv::WriterBuilder::new().terminator(csv::Terminator::Any(b'\n')).from_writer(Vec::new());
    writer.write_record(&header).map_err(export_error)?;

    for row in rows {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(row.point.name.clone().unwrap_or_default());
        record.push(format_coordinate(row.point.lat));
        record.push(format_coordinate(row.point.lon));
        if with_street {
            record.push(row.street.clone().unwrap_or_default());
        }
        record.push(row.boundary.clone().unwrap_or_default());

        for column in extra {
            let value = row
                .point
                .extended
                .iter()
                .find(|(name, _)| name == column)
                .and_then(|(_, value)| value.clone());
            record.push(value.unwrap_or_default());
        }

        writer.write_record(&record).map_err(export_error)?;
    }

    writer.into_inner().map_err(|e| Error::Export(e.to_string()))
}

/// Shortest round-trip decimal, with `.0` on integral values.
fn format_coordinate(value: f64) -> String {
    let rendered = value.to_string();
    if value.is_finite() && !rendered.contains('.') { format!("{rendered}.0") } else { rendered }
}

fn export_error(err: csv::Error) -> Error {
    Error::Export(err.to_string())
}
