//! `kmz2csv convert`

use std::path::Path;

use anyhow::{Context, Result};
use kmz2csv_client::{CachedGeocoder, ConversionReport, ConvertOptions, Converter, NominatimClient, Upload};
use kmz2csv_core::{AppConfig, CacheDb};
use tokio::io::AsyncWriteExt;

pub async fn run(config: &AppConfig, input: &Path, output: Option<&Path>, geocode: bool) -> Result<()> {
    let bytes = tokio::fs::read(input).await.with_context(|| format!("failed to read {}", input.display()))?;
    if bytes.len() > config.max_upload_bytes {
        anyhow::bail!("{} is larger than {} bytes", input.display(), config.max_upload_bytes);
    }

    let filename = input.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let upload = Upload::new(filename, bytes);

    let cache = CacheDb::open(&config.db_path).await?;
    let upstream = NominatimClient::from_app_config(config)?;
    let converter = Converter::new(CachedGeocoder::new(cache, upstream, config.coord_precision), config.max_upload_bytes);

    let conversion = converter.convert(&upload, ConvertOptions { geocode }).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &conversion.csv)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&conversion.csv).await?;
            stdout.flush().await?;
        }
    }

    eprintln!("{}", summary(&conversion.report, geocode));
    Ok(())
}

fn summary(report: &ConversionReport, geocode: bool) -> String {
    let mut line = format!(
        "{} points, {} boundaries, {} points inside a boundary",
        report.points, report.boundaries, report.assigned
    );
    if geocode {
        line.push_str(&format!(
            "; streets: {} cached, {} fetched, {} failed",
            report.cache_hits, report.fetched, report.failed
        ));
        if report.upstream_blocked {
            line.push_str(" (Nominatim refused requests; check NOMINATIM_USER_AGENT)");
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    const KML: &str = r#"<kml><Placemark><name>HP-1</name><Point><coordinates>107.5,-6.5</coordinates></Point></Placemark></kml>"#;

    #[tokio::test]
    async fn test_convert_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("survey.kml");
        let output = dir.path().join("survey.csv");
        std::fs::write(&input, KML).unwrap();

        let config = AppConfig { db_path: dir.path().join("geocache.sqlite"), ..Default::default() };
        run(&config, &input, Some(&output), false).await.unwrap();

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv, "homepass,lat,lon,boundary\nHP-1,-6.5,107.5,\n");
    }

    #[tokio::test]
    async fn test_convert_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig { db_path: dir.path().join("geocache.sqlite"), ..Default::default() };
        let err = run(&config, &dir.path().join("nope.kmz"), None, false).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_summary() {
        let report = ConversionReport {
            points: 3,
            boundaries: 1,
            assigned: 2,
            cache_hits: 1,
            fetched: 1,
            failed: 1,
            upstream_blocked: true,
        };
        assert_eq!(summary(&report, false), "3 points, 1 boundaries, 2 points inside a boundary");
        assert!(summary(&report, true).contains("1 cached, 1 fetched, 1 failed"));
        assert!(summary(&report, true).contains("refused"));
    }
}
