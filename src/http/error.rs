use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::catalog::CatalogError;
use crate::exporter::ExportError;
use crate::importer::ImportError;
use crate::media::MediaError;

/// Boundary error: core failures mapped to an HTTP status plus the response
/// envelope `{"ok": false, "error": {code, message, details}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> ApiError {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> ApiError {
        ApiError {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> ApiError {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (self.status, Json(json!({ "ok": false, "error": error }))).into_response()
    }
}

/// Success envelope.
pub fn ok(result: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "result": result }))
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> ApiError {
        match err {
            CatalogError::Validation(errors) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "validation_failed",
                message: errors.join(" "),
                details: Some(json!({ "errors": errors })),
            },
            CatalogError::DuplicateItem { existing } => ApiError {
                status: StatusCode::CONFLICT,
                code: "duplicate_item",
                message: "there is already a card with the same key (duplicate variant)"
                    .to_string(),
                details: Some(json!({ "existing": existing })),
            },
            CatalogError::Conflict(message) => ApiError {
                status: StatusCode::CONFLICT,
                code: "conflict",
                message,
                details: None,
            },
            CatalogError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            CatalogError::Db(e) => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "db_failed",
                message: e.to_string(),
                details: None,
            },
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> ApiError {
        ApiError::from(CatalogError::Db(err))
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> ApiError {
        match err {
            ImportError::MissingColumns(missing) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "missing_columns",
                message: format!("missing required columns: {}", missing.join(", ")),
                details: Some(json!({ "missing": missing })),
            },
            ImportError::Csv(e) => ApiError::bad_request(format!("unreadable csv: {e}")),
            ImportError::Db(e) => ApiError::from(e),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> ApiError {
        match err {
            MediaError::UnsupportedType(t) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "unsupported_image_type",
                message: format!("unsupported image type: {t}"),
                details: None,
            },
            MediaError::ItemNotFound => ApiError::not_found("item not found"),
            MediaError::Io(e) => ApiError::internal(format!("media write failed: {e}")),
            MediaError::Db(e) => ApiError::from(e),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> ApiError {
        match err {
            ExportError::Catalog(e) => ApiError::from(e),
            ExportError::Csv(e) => ApiError::internal(format!("csv write failed: {e}")),
        }
    }
}
