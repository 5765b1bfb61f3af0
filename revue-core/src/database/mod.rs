//! Pool construction and PostgreSQL repositories
//!
//! Each repository is a thin, cloneable wrapper over the shared [`PgPool`].
//! All consistency guarantees live in the schema (unique constraints,
//! cascade deletes); the repositories translate constraint violations into
//! the domain error taxonomy at this boundary.

pub mod repositories;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::{CatalogError, Result};

pub use repositories::{
    reviews::ReviewsRepository, terms::TermsRepository, titles::TitlesRepository,
    users::UsersRepository,
};

/// Connects a pool with the given bound. Fails fast: the first connection
/// is established eagerly.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| CatalogError::Internal(format!("failed to connect to PostgreSQL: {}", e)))
}
