use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::storage_error;
use crate::api_types::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::catalog::{Term, TermKind, Title, TitleFilter, TitleWrite};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, sqlx::FromRow)]
struct TitleRow {
    id: Uuid,
    name: String,
    year: Option<i32>,
    description: Option<String>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    category_slug: Option<String>,
    rating: Option<i32>,
}

impl TitleRow {
    fn into_title(self, genre: Vec<Term>) -> Title {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Term { id, name, slug }),
            _ => None,
        };
        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            description: self.description,
            category,
            genre,
            rating: self.rating,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct GenreLinkRow {
    title_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
}

/// The select list shared by every title read: category expanded via LEFT
/// JOIN, rating recomputed as the floor of the mean review score.
const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
     (SELECT FLOOR(AVG(r.score))::INT4 FROM reviews r WHERE r.title_id = t.id) AS rating \
     FROM titles t LEFT JOIN categories c ON c.id = t.category_id";

/// PostgreSQL-backed store for titles and their genre associations.
#[derive(Debug, Clone)]
pub struct TitlesRepository {
    pool: PgPool,
}

impl TitlesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists titles with the combinable optional filters, ordered by name.
    pub async fn list(&self, filter: &TitleFilter) -> Result<(i64, Vec<Title>)> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);

        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id");
        push_filters(&mut count_query, filter);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("failed to count titles", e))?;

        let mut query = QueryBuilder::<Postgres>::new(TITLE_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY t.name, t.id LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows: Vec<TitleRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("failed to list titles", e))?;

        let mut genres = self.genres_for(rows.iter().map(|r| r.id).collect()).await?;
        let titles = rows
            .into_iter()
            .map(|row| {
                let genre = genres.remove(&row.id).unwrap_or_default();
                row.into_title(genre)
            })
            .collect();
        Ok((count, titles))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Title>> {
        let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to get title", e))?;

        let Some(row) = row else { return Ok(None) };
        let mut genres = self.genres_for(vec![row.id]).await?;
        let genre = genres.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_title(genre)))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("failed to check title", e))?;
        Ok(found)
    }

    /// Creates a title, resolving category and genre slugs first. An
    /// unresolved slug is a validation error, not a storage fault.
    pub async fn create(&self, write: &TitleWrite) -> Result<Title> {
        let name = write
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CatalogError::invalid("name", "this field is required"))?;
        let category_id = self.resolve_category(write.category.as_deref()).await?;
        let genre_ids = self
            .resolve_genres(write.genre.as_deref().unwrap_or(&[]))
            .await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("failed to start transaction", e))?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO titles (id, name, year, description, category_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(id)
        .bind(name)
        .bind(write.year)
        .bind(write.description.as_deref())
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("failed to create title", e))?;

        for genre_id in &genre_ids {
            sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("failed to link genre", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit title", e))?;

        info!(%id, name, "created title");
        self.get(id)
            .await?
            .ok_or_else(|| CatalogError::Internal("created title vanished".to_string()))
    }

    /// Partial update. A supplied genre list replaces the associations
    /// wholesale; an absent one leaves them untouched. Returns `None` when
    /// the title does not exist.
    pub async fn update(&self, id: Uuid, write: &TitleWrite) -> Result<Option<Title>> {
        if !self.exists(id).await? {
            return Ok(None);
        }

        let category_id = self.resolve_category(write.category.as_deref()).await?;
        let genre_ids = match write.genre.as_deref() {
            Some(slugs) => Some(self.resolve_genres(slugs).await?),
            None => None,
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("failed to start transaction", e))?;

        sqlx::query(
            "UPDATE titles SET \
               name = COALESCE($2, name), \
               year = COALESCE($3, year), \
               description = COALESCE($4, description), \
               category_id = CASE WHEN $5 THEN $6 ELSE category_id END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(write.name.as_deref().map(str::trim))
        .bind(write.year)
        .bind(write.description.as_deref())
        .bind(write.category.is_some())
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("failed to update title", e))?;

        if let Some(genre_ids) = genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("failed to clear genres", e))?;
            for genre_id in &genre_ids {
                sqlx::query("INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| storage_error("failed to link genre", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("failed to commit title update", e))?;

        self.get(id).await
    }

    /// Deletes the title; reviews and their comments go with it via the
    /// schema's cascade rules.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete title", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn resolve_category(&self, slug: Option<&str>) -> Result<Option<Uuid>> {
        let Some(slug) = slug else { return Ok(None) };
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("failed to resolve category", e))?;
        match id {
            Some(id) => Ok(Some(id)),
            None => Err(CatalogError::invalid(
                "category",
                format!("unknown {} slug \"{}\"", TermKind::Category.noun(), slug),
            )),
        }
    }

    async fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<Uuid>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, slug FROM genres WHERE slug = ANY($1)")
                .bind(slugs)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| storage_error("failed to resolve genres", e))?;

        let by_slug: HashMap<&str, Uuid> =
            rows.iter().map(|(id, slug)| (slug.as_str(), *id)).collect();

        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            match by_slug.get(slug.as_str()) {
                Some(id) if !ids.contains(id) => ids.push(*id),
                Some(_) => {}
                None => {
                    return Err(CatalogError::invalid(
                        "genre",
                        format!("unknown {} slug \"{}\"", TermKind::Genre.noun(), slug),
                    ));
                }
            }
        }
        Ok(ids)
    }

    async fn genres_for(&self, title_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<Term>>> {
        if title_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<GenreLinkRow> = sqlx::query_as(
            "SELECT tg.title_id, g.id, g.name, g.slug \
             FROM title_genres tg \
             JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = ANY($1) \
             ORDER BY g.name",
        )
        .bind(&title_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("failed to load genres", e))?;

        let mut map: HashMap<Uuid, Vec<Term>> = HashMap::new();
        for row in rows {
            map.entry(row.title_id).or_default().push(Term {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }
        Ok(map)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    query.push(" WHERE TRUE");
    if let Some(category) = filter.category.as_deref() {
        query.push(" AND c.slug = ");
        query.push_bind(category.to_string());
    }
    if let Some(genre) = filter.genre.as_deref() {
        query.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg \
             JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = t.id AND g.slug = ",
        );
        query.push_bind(genre.to_string());
        query.push(")");
    }
    if let Some(name) = filter.name.as_deref() {
        query.push(" AND t.name ILIKE ");
        query.push_bind(format!("%{}%", name));
    }
    if let Some(year) = filter.year {
        query.push(" AND t.year = ");
        query.push_bind(year);
    }
}
