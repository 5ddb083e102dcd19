//! Pulling the KML document out of an upload.

use std::borrow::Cow;
use std::io::{Cursor, Read};

use kmz2csv_core::Error;
use zip::read::ZipArchive;

/// Entry name Google Earth writes for the main document of a KMZ.
const PRIMARY_ENTRY: &str = "doc.kml";

/// Upload kind, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Kml,
    Kmz,
}

impl SourceKind {
    /// Classify a filename, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, Error> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".kml") {
            Ok(SourceKind::Kml)
        } else if lower.ends_with(".kmz") {
            Ok(SourceKind::Kmz)
        } else {
            Err(Error::UnsupportedFile("file must be .kmz or .kml".into()))
        }
    }
}

/// Return the KML bytes of an uploaded `.kml` or `.kmz` file.
///
/// A `.kml` upload is returned as-is. For a `.kmz`, the root `doc.kml` entry
/// wins; otherwise the first `.kml` entry in archive order is used. The
/// decompressed entry may not exceed `max_bytes`.
pub fn extract_kml<'a>(bytes: &'a [u8], filename: &str, max_bytes: usize) -> Result<Cow<'a, [u8]>, Error> {
    match SourceKind::from_filename(filename)? {
        SourceKind::Kml => Ok(Cow::Borrowed(bytes)),
        SourceKind::Kmz => read_kmz(bytes, max_bytes).map(Cow::Owned),
    }
}

fn read_kmz(bytes: &[u8], max_bytes: usize) -> Result<Vec<u8>, Error> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt_archive)?;

    let mut first_kml = None;
    let mut primary = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(corrupt_archive)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_ascii_lowercase();
        if name == PRIMARY_ENTRY {
            primary = Some(index);
            break;
        }
        if name.ends_with(".kml") && first_kml.is_none() {
            first_kml = Some(index);
        }
    }

    let index = primary
        .or(first_kml)
        .ok_or_else(|| Error::InvalidInput("KMZ archive contains no .kml file".into()))?;

    let entry = archive.by_index(index).map_err(corrupt_archive)?;
    let name = entry.name().to_string();
    tracing::debug!(entry = %name, size = entry.size(), "reading KML from KMZ");

    let mut kml = Vec::new();
    entry.take(max_bytes as u64 + 1).read_to_end(&mut kml).map_err(|e| {
        Error::InvalidInput(format!("failed to decompress {name}: {e}"))
    })?;

    if kml.len() > max_bytes {
        return Err(Error::PayloadTooLarge(format!("{name} exceeds {max_bytes} bytes when decompressed")));
    }

    Ok(kml)
}

fn corrupt_archive(err: zip::result::ZipError) -> Error {
    Error::InvalidInput(format!("invalid KMZ archive: {err}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn build_kmz(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_kml_passes_through() {
        let body = b"<kml/>";
        let kml = extract_kml(body, "Survey.KML", 1024).unwrap();
        assert_eq!(kml.as_ref(), body);
        assert!(matches!(kml, Cow::Borrowed(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract_kml(b"a,b", "points.csv", 1024).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFile(_)));
        assert!(matches!(extract_kml(b"", "", 1024), Err(Error::UnsupportedFile(_))));
    }

    #[test]
    fn test_kmz_prefers_doc_kml() {
        let kmz = build_kmz(&[("layers/extra.kml", "<extra/>"), ("doc.kml", "<main/>")]);
        let kml = extract_kml(&kmz, "area.kmz", 1024).unwrap();
        assert_eq!(kml.as_ref(), b"<main/>");
    }

    #[test]
    fn test_kmz_falls_back_to_first_kml() {
        let kmz = build_kmz(&[("images/icon.png", "png"), ("Cluster A.kml", "<a/>"), ("Cluster B.kml", "<b/>")]);
        let kml = extract_kml(&kmz, "clusters.kmz", 1024).unwrap();
        assert_eq!(kml.as_ref(), b"<a/>");
    }

    #[test]
    fn test_kmz_without_kml() {
        let kmz = build_kmz(&[("readme.txt", "nothing here")]);
        let err = extract_kml(&kmz, "empty.kmz", 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("no .kml")));
    }

    #[test]
    fn test_corrupt_kmz() {
        let err = extract_kml(b"not a zip at all", "broken.kmz", 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("invalid KMZ")));
    }

    #[test]
    fn test_entry_size_limit() {
        let big = "x".repeat(2048);
        let kmz = build_kmz(&[("doc.kml", big.as_str())]);
        assert!(matches!(extract_kml(&kmz, "big.kmz", 1024), Err(Error::PayloadTooLarge(_))));
        assert_eq!(extract_kml(&kmz, "big.kmz", 2048).unwrap().len(), 2048);
    }
}
