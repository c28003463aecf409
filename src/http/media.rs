use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::json;

use super::error::{ok, ApiError};
use super::state::AppState;

/// Multipart form with a single `file` field; the declared content type
/// decides acceptance (jpeg/png/webp only).
pub async fn upload(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("bad multipart payload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("file read failed: {e}")))?;
        upload = Some((content_type, bytes.to_vec()));
    }

    let Some((content_type, bytes)) = upload else {
        return Err(ApiError::bad_request("missing file in multipart form"));
    };

    let rel = state
        .media
        .attach_image(&state.db(), item_id, &content_type, &bytes)?;
    Ok(ok(json!({ "item_id": item_id, "image_path": rel })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.media.remove_image(&state.db(), item_id)?;
    Ok(ok(json!({ "item_id": item_id })))
}
