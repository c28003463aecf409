use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::exporter;
use crate::importer::{self, DupPolicy, ImportOptions};

use super::error::{ok, ApiError};
use super::items::ListParams;
use super::state::AppState;

fn csv_response(filename: &'static str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

/// Export the catalog with the same filter parameters as the listing page.
pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_query();
    let mut body = Vec::new();
    exporter::export_csv(&state.db(), &query, &mut body)?;
    Ok(csv_response("cards_export.csv", body))
}

pub async fn export_sample() -> impl IntoResponse {
    csv_response("cards_sample.csv", exporter::sample_csv().into_bytes())
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Multipart form: `file` (the CSV), `dup_policy` (skip/merge/overwrite,
/// default merge), `create_missing_tags` (default true).
pub async fn import_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut opts = ImportOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("bad multipart payload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("file read failed: {e}")))?;
                file = Some(bytes.to_vec());
            }
            Some("dup_policy") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("field read failed: {e}")))?;
                opts.policy = DupPolicy::parse(&value).unwrap_or_default();
            }
            Some("create_missing_tags") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("field read failed: {e}")))?;
                opts.create_missing_tags = parse_flag(&value, true);
            }
            _ => {}
        }
    }

    let Some(bytes) = file else {
        return Err(ApiError::bad_request("missing file in multipart form"));
    };

    let report = importer::import_csv(&state.db(), &bytes, &opts)?;
    Ok(ok(json!(report)))
}
