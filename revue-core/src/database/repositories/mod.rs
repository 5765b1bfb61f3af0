pub mod reviews;
pub mod terms;
pub mod titles;
pub mod users;

use crate::error::CatalogError;

/// Returns the violated constraint name when the error is a database-level
/// constraint violation, for translation into domain errors.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    err.as_database_error().and_then(|db_err| db_err.constraint())
}

/// Fallback mapping for storage errors that no repository-specific
/// translation claimed.
pub(crate) fn storage_error(context: &str, err: sqlx::Error) -> CatalogError {
    CatalogError::Internal(format!("{}: {}", context, err))
}
