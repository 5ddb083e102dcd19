//! KMZ/KML upload conversion.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use kmz2csv_client::{ConvertOptions, Upload};
use kmz2csv_core::Error;

use crate::error::ApiError;
use crate::state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// `POST /convert`
///
/// Multipart fields: `file` (required) and `with_geocode` (a non-empty value
/// turns geocoding on).
pub async fn convert(State(state): State<AppState>, mut multipart: Multipart) -> Result<Response, ApiError> {
    let mut upload: Option<Upload> = None;
    let mut options = ConvertOptions::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if bytes.len() > state.max_upload_bytes {
                    return Err(Error::PayloadTooLarge(format!(
                        "upload exceeds {} bytes",
                        state.max_upload_bytes
                    ))
                    .into());
                }
                upload = Some(Upload::new(filename, bytes.to_vec()));
            }
            Some("with_geocode") => options.geocode = !field.text().await?.is_empty(),
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| Error::InvalidInput("missing 'file' field".into()))?;

    tracing::info!(file = %upload.filename, bytes = upload.bytes.len(), geocode = options.geocode, "converting upload");

    let conversion = state.converter.convert(&upload, options).await?;
    let disposition = format!("attachment; filename=\"{}\"", upload.csv_filename());

    Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()), (header::CONTENT_DISPOSITION, disposition)], conversion.csv)
        .into_response())
}
