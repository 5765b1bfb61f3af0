use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use revue_core::error::{CatalogError, FieldError};

pub type AppResult<T> = Result<T, AppError>;

/// HTTP-facing error: a status, a message, and (for validation failures)
/// the per-field breakdown.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Vec<FieldError>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Per-field validation failure, 400 with an `errors` map.
    pub fn validation(fields: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_string(),
            fields,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.fields.is_empty() {
            let mut errors = serde_json::Map::new();
            for field in &self.fields {
                errors
                    .entry(field.field.clone())
                    .or_insert_with(|| json!([]))
                    .as_array_mut()
                    .expect("errors entries are arrays")
                    .push(json!(field.message));
            }
            return (self.status, Json(json!({ "errors": errors }))).into_response();
        }

        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            CatalogError::Validation(fields) => Self::validation(fields),
            CatalogError::PermissionDenied(msg) => Self::forbidden(msg),
            // Conflicts surface as 400 in the same error-map shape the
            // validation path produces, under the "detail" key.
            CatalogError::Conflict(msg) => {
                Self::validation(vec![FieldError::new("detail", msg)])
            }
            CatalogError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                Self::internal("internal server error")
            }
        }
    }
}
