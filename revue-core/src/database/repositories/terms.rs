use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{storage_error, violated_constraint};
use crate::api_types::ListParams;
use crate::catalog::{Term, TermKind};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
struct TermRow {
    id: Uuid,
    name: String,
    slug: String,
}

impl From<TermRow> for Term {
    fn from(row: TermRow) -> Self {
        Term {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

/// One store for both reference-entity tables; [`TermKind`] selects the
/// table. The table name is interpolated from a closed enum, never from
/// request input.
#[derive(Debug, Clone)]
pub struct TermsRepository {
    pool: PgPool,
}

impl TermsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists terms ordered by name, with an optional name substring search.
    pub async fn list(&self, kind: TermKind, params: &ListParams) -> Result<(i64, Vec<Term>)> {
        let pattern = params.search().map(|s| format!("%{}%", s));
        let table = kind.table();

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE ($1::TEXT IS NULL OR name ILIKE $1)"
        ))
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("failed to count terms", e))?;

        let rows = sqlx::query_as::<_, TermRow>(&format!(
            "SELECT id, name, slug FROM {table} \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name \
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("failed to list terms", e))?;

        Ok((count, rows.into_iter().map(Into::into).collect()))
    }

    pub async fn get_by_slug(&self, kind: TermKind, slug: &str) -> Result<Option<Term>> {
        let row = sqlx::query_as::<_, TermRow>(&format!(
            "SELECT id, name, slug FROM {} WHERE slug = $1",
            kind.table()
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get term by slug", e))?;
        Ok(row.map(Into::into))
    }

    /// Inserts a term; a duplicate slug surfaces as a per-field validation
    /// error, whether caught here or by the unique constraint under a race.
    pub async fn create(&self, kind: TermKind, name: &str, slug: &str) -> Result<Term> {
        let table = kind.table();
        let slug_constraint = format!("{table}_slug_key");

        let row = sqlx::query_as::<_, TermRow>(&format!(
            "INSERT INTO {table} (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug"
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if violated_constraint(&e) == Some(slug_constraint.as_str()) {
                CatalogError::invalid(
                    "slug",
                    format!("a {} with this slug already exists", kind.noun()),
                )
            } else {
                storage_error("failed to create term", e)
            }
        })?;

        info!(kind = kind.noun(), slug = %row.slug, "created term");
        Ok(row.into())
    }

    pub async fn delete_by_slug(&self, kind: TermKind, slug: &str) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", kind.table()))
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete term", e))?;
        Ok(result.rows_affected() > 0)
    }
}
