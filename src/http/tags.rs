use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;

use crate::catalog;

use super::error::{ok, ApiError};
use super::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let tags = catalog::list_tags(&state.db())?;
    Ok(ok(json!({ "tags": tags })))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagForm {
    pub name: String,
}

pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<CreateTagForm>,
) -> Result<impl IntoResponse, ApiError> {
    let id = catalog::create_tag(&state.db(), &form.name)?;
    Ok((
        StatusCode::CREATED,
        ok(json!({ "id": id, "name": form.name.trim() })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RenameTagForm {
    pub new_name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<RenameTagForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    catalog::rename_tag(&state.db(), id, &form.new_name)?;
    Ok(ok(json!({ "id": id, "name": form.new_name.trim() })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    catalog::delete_tag(&state.db(), id)?;
    Ok(ok(json!({ "deleted": id })))
}

/// Attach by tag id, or by name with find-or-create.
#[derive(Debug, Default, Deserialize)]
pub struct AttachTagForm {
    pub tag_id: Option<i64>,
    pub tag_name: Option<String>,
}

pub async fn attach(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Form(form): Form<AttachTagForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = state.db();
    let tag_id = match (form.tag_id, form.tag_name.as_deref()) {
        (Some(id), _) => id,
        (None, Some(name)) if !name.trim().is_empty() => {
            catalog::find_or_create_tag(&conn, name.trim())?
        }
        _ => return Err(ApiError::bad_request("invalid tag")),
    };
    catalog::attach_tag(&conn, item_id, tag_id)?;
    Ok(ok(json!({ "item_id": item_id, "tag_id": tag_id })))
}

#[derive(Debug, Deserialize)]
pub struct DetachTagForm {
    pub tag_id: i64,
}

pub async fn detach(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Form(form): Form<DetachTagForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    catalog::detach_tag(&state.db(), item_id, form.tag_id)?;
    Ok(ok(json!({ "item_id": item_id, "tag_id": form.tag_id })))
}
