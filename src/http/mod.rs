pub mod error;
mod items;
mod media;
mod state;
mod tags;
mod transfer;

pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let media_dir = state.media.root().to_path_buf();
    Router::new()
        .route("/health", get(health))
        .route("/items", get(items::list).post(items::create))
        .route("/item/:id", get(items::detail))
        .route("/item/:id/edit", post(items::update))
        .route("/item/:id/delete", post(items::delete))
        .route("/item/:id/merge-add", post(items::merge_add))
        .route("/items/bulk/adjust-qty", post(items::bulk_adjust_qty))
        .route("/items/bulk/set-status", post(items::bulk_set_status))
        .route("/items/bulk/add-tag", post(items::bulk_add_tag))
        .route("/items/bulk/remove-tag", post(items::bulk_remove_tag))
        .route("/items/bulk-delete", post(items::bulk_delete))
        .route("/item/:id/image", post(media::upload))
        .route("/item/:id/image/delete", post(media::delete))
        .route("/item/:id/tags/attach", post(tags::attach))
        .route("/item/:id/tags/detach", post(tags::detach))
        .route("/tags", get(tags::list).post(tags::create))
        .route("/tags/:id/rename", post(tags::rename))
        .route("/tags/:id/delete", post(tags::delete))
        .route("/export/csv", get(transfer::export_csv))
        .route("/export/sample", get(transfer::export_sample))
        .route("/import/csv", post(transfer::import_csv))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
