use serde::Serialize;
use thiserror::Error;

/// A single failed validation check, attributed to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Unknown id, slug, or username, or a nested resource that does not
    /// belong to the claimed parent.
    #[error("{0} not found")]
    NotFound(String),

    /// Malformed or out-of-range input, reported per field.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Authenticated actor with insufficient tier or ownership.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate review, or any other uniqueness violation surfaced as a
    /// domain error rather than a storage fault.
    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Internal(format!("database error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
