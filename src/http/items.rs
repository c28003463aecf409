use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;

use crate::catalog::{self, ItemQuery};
use crate::model::{ComercialCondition, Condition, ItemDraft, Language, Rarity};

use super::error::{ok, ApiError};
use super::state::AppState;

/// Listing/filter query parameters, all optional and tolerantly parsed:
/// unrecognized enum values and non-numeric numbers filter nothing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub game: Option<String>,
    pub set_name: Option<String>,
    pub rarity: Option<String>,
    pub condition: Option<String>,
    pub language: Option<String>,
    pub comercial_condition: Option<String>,
    pub number_set: Option<String>,
    pub quantity_min: Option<String>,
    pub quantity_max: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

fn to_int_or_none(value: Option<&str>) -> Option<i64> {
    value?.trim().parse().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ListParams {
    pub fn into_query(self) -> ItemQuery {
        ItemQuery {
            number_set: to_int_or_none(self.number_set.as_deref()),
            quantity_min: to_int_or_none(self.quantity_min.as_deref()),
            quantity_max: to_int_or_none(self.quantity_max.as_deref()),
            rarity: self.rarity.as_deref().and_then(Rarity::parse),
            condition: self.condition.as_deref().and_then(Condition::parse),
            language: self.language.as_deref().and_then(Language::parse),
            comercial_condition: self
                .comercial_condition
                .as_deref()
                .and_then(ComercialCondition::parse),
            page: to_int_or_none(self.page.as_deref()).unwrap_or(1),
            size: to_int_or_none(self.size.as_deref()).unwrap_or(20),
            q: non_empty(self.q),
            tag: non_empty(self.tag),
            game: non_empty(self.game),
            set_name: non_empty(self.set_name),
            sort_by: non_empty(self.sort_by),
            sort_dir: non_empty(self.sort_dir),
        }
    }
}

/// Item form fields, raw; validation happens in the model layer so the CSV
/// importer and this path share one rulebook.
#[derive(Debug, Default, Deserialize)]
pub struct ItemForm {
    pub name: Option<String>,
    pub game: Option<String>,
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub number_set: Option<String>,
    pub rarity: Option<String>,
    pub condition: Option<String>,
    pub language: Option<String>,
    pub quantity: Option<String>,
    pub location: Option<String>,
    pub comercial_condition: Option<String>,
    pub variant: Option<String>,
    pub notes: Option<String>,
}

impl ItemForm {
    fn into_draft(self) -> ItemDraft {
        ItemDraft {
            name: self.name,
            game: self.game,
            set_name: self.set_name,
            set_code: self.set_code,
            number_set: self.number_set,
            rarity: self.rarity,
            condition: self.condition,
            language: self.language,
            quantity: self.quantity,
            location: self.location,
            comercial_condition: self.comercial_condition,
            variant: self.variant,
            notes: self.notes,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = params.into_query();
    let page = catalog::search_items(&state.db(), &query)?;
    Ok(ok(json!(page)))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = state.db();
    let Some(item) = catalog::get_item(&conn, id)? else {
        return Err(ApiError::not_found("item not found"));
    };
    let tags = catalog::tags_for_item(&conn, id)?;
    Ok(ok(json!({ "item": item, "tags": tags })))
}

pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<ItemForm>,
) -> Result<impl IntoResponse, ApiError> {
    let input = form
        .into_draft()
        .validate()
        .map_err(catalog::CatalogError::Validation)?;
    let conn = state.db();
    let id = catalog::insert_item(&conn, &input)?;
    let item = catalog::get_item(&conn, id)?;
    Ok((StatusCode::CREATED, ok(json!({ "id": id, "item": item }))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let input = form
        .into_draft()
        .validate()
        .map_err(catalog::CatalogError::Validation)?;
    let conn = state.db();
    catalog::update_item(&conn, id, &input)?;
    let item = catalog::get_item(&conn, id)?;
    Ok(ok(json!({ "item": item })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let image_path = catalog::delete_item(&state.db(), id)?;
    if let Some(rel) = image_path {
        state.media.remove_files(&rel);
    }
    Ok(ok(json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct MergeAddForm {
    pub delta: i64,
}

pub async fn merge_add(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<MergeAddForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let quantity = catalog::merge_add_quantity(&state.db(), id, form.delta)?;
    Ok(ok(json!({ "id": id, "quantity": quantity })))
}

/// Multi-select forms post ids as one comma-separated field.
fn parse_ids(raw: &str) -> Result<Vec<i64>, ApiError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse()
            .map_err(|_| ApiError::bad_request(format!("bad item id: {part:?}")))?;
        ids.push(id);
    }
    Ok(ids)
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustForm {
    pub ids: String,
    pub delta: i64,
}

pub async fn bulk_adjust_qty(
    State(state): State<AppState>,
    Form(form): Form<BulkAdjustForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids = parse_ids(&form.ids)?;
    let changed = catalog::bulk_adjust_quantity(&state.db(), &ids, form.delta)?;
    Ok(ok(json!({ "changed": changed })))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusForm {
    pub ids: String,
    pub status: String,
}

pub async fn bulk_set_status(
    State(state): State<AppState>,
    Form(form): Form<BulkStatusForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids = parse_ids(&form.ids)?;
    let Some(status) = ComercialCondition::parse(&form.status) else {
        return Err(ApiError::bad_request("Invalid Comercial Condition."));
    };
    let changed = catalog::bulk_set_status(&state.db(), &ids, status)?;
    Ok(ok(json!({ "changed": changed })))
}

#[derive(Debug, Deserialize)]
pub struct BulkTagForm {
    pub ids: String,
    pub tag: String,
}

pub async fn bulk_add_tag(
    State(state): State<AppState>,
    Form(form): Form<BulkTagForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids = parse_ids(&form.ids)?;
    if form.tag.trim().is_empty() {
        return Err(ApiError::bad_request("The tag name is required."));
    }
    let attached = catalog::bulk_add_tag(&state.db(), &ids, form.tag.trim())?;
    Ok(ok(json!({ "attached": attached })))
}

pub async fn bulk_remove_tag(
    State(state): State<AppState>,
    Form(form): Form<BulkTagForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids = parse_ids(&form.ids)?;
    let detached = catalog::bulk_remove_tag(&state.db(), &ids, &form.tag)?;
    Ok(ok(json!({ "detached": detached })))
}

#[derive(Debug, Deserialize)]
pub struct BulkIdsForm {
    pub ids: String,
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    Form(form): Form<BulkIdsForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ids = parse_ids(&form.ids)?;
    let image_paths = catalog::bulk_delete(&state.db(), &ids)?;
    for rel in &image_paths {
        state.media.remove_files(rel);
    }
    Ok(ok(json!({ "deleted": ids.len() })))
}
