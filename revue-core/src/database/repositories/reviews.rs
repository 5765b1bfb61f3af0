use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{storage_error, violated_constraint};
use crate::error::{CatalogError, Result};
use crate::review::{Comment, ONE_REVIEW_PER_TITLE, Review};
use crate::user::User;

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    text: String,
    score: i32,
    author: String,
    author_id: Uuid,
    title_id: Uuid,
    pub_date: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Review {
            id: row.id,
            text: row.text,
            score: row.score,
            author: row.author,
            author_id: row.author_id,
            title_id: row.title_id,
            pub_date: row.pub_date,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    text: String,
    author: String,
    author_id: Uuid,
    review_id: Uuid,
    pub_date: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            text: row.text,
            author: row.author,
            author_id: row.author_id,
            review_id: row.review_id,
            pub_date: row.pub_date,
        }
    }
}

const REVIEW_SELECT: &str = "SELECT r.id, r.text, r.score, u.username AS author, \
     r.author_id, r.title_id, r.created_at AS pub_date \
     FROM reviews r JOIN users u ON u.id = r.author_id";

const COMMENT_SELECT: &str = "SELECT c.id, c.text, u.username AS author, \
     c.author_id, c.review_id, c.created_at AS pub_date \
     FROM comments c JOIN users u ON u.id = c.author_id";

/// PostgreSQL-backed store for the review/comment workflow.
#[derive(Debug, Clone)]
pub struct ReviewsRepository {
    pool: PgPool,
}

impl ReviewsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_title(
        &self,
        title_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<Review>)> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("failed to count reviews", e))?;

        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 \
             ORDER BY r.created_at DESC, r.id LIMIT $2 OFFSET $3"
        ))
        .bind(title_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("failed to list reviews", e))?;

        Ok((count, rows.into_iter().map(Into::into).collect()))
    }

    /// Fetches a review only when it belongs to the claimed title, so a
    /// cross-referenced id resolves to not-found rather than leaking another
    /// title's review.
    pub async fn get(&self, title_id: Uuid, review_id: Uuid) -> Result<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2"
        ))
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get review", e))?;
        Ok(row.map(Into::into))
    }

    /// Creates the author's review of a title. The existence pre-check
    /// gives the friendly conflict; the `one_review_per_title` constraint is
    /// the authoritative guard when two requests race past the pre-check,
    /// and both produce the same error.
    pub async fn create(
        &self,
        title_id: Uuid,
        author: &User,
        text: &str,
        score: i32,
    ) -> Result<Review> {
        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
        )
        .bind(title_id)
        .bind(author.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("failed to check for existing review", e))?;
        if already {
            return Err(CatalogError::Conflict(ONE_REVIEW_PER_TITLE.to_string()));
        }

        let row: (Uuid, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO reviews (id, title_id, author_id, text, score, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(title_id)
        .bind(author.id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if violated_constraint(&e) == Some("one_review_per_title") {
                CatalogError::Conflict(ONE_REVIEW_PER_TITLE.to_string())
            } else {
                storage_error("failed to create review", e)
            }
        })?;

        Ok(Review {
            id: row.0,
            text: text.to_string(),
            score,
            author: author.username.clone(),
            author_id: author.id,
            title_id,
            pub_date: row.1,
        })
    }

    /// Partial update of text and/or score; ownership was checked by the
    /// caller against the fetched review.
    pub async fn update(
        &self,
        review: &Review,
        text: Option<&str>,
        score: Option<i32>,
    ) -> Result<Review> {
        sqlx::query("UPDATE reviews SET text = COALESCE($2, text), score = COALESCE($3, score) WHERE id = $1")
            .bind(review.id)
            .bind(text)
            .bind(score)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to update review", e))?;

        self.get(review.title_id, review.id)
            .await?
            .ok_or_else(|| CatalogError::not_found("review"))
    }

    pub async fn delete(&self, review_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete review", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_comments(
        &self,
        review_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(i64, Vec<Comment>)> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("failed to count comments", e))?;

        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 \
             ORDER BY c.created_at, c.id LIMIT $2 OFFSET $3"
        ))
        .bind(review_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("failed to list comments", e))?;

        Ok((count, rows.into_iter().map(Into::into).collect()))
    }

    /// Same belongs-to rule as [`ReviewsRepository::get`], one level down.
    pub async fn get_comment(&self, review_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2"
        ))
        .bind(comment_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get comment", e))?;
        Ok(row.map(Into::into))
    }

    pub async fn create_comment(
        &self,
        review_id: Uuid,
        author: &User,
        text: &str,
    ) -> Result<Comment> {
        let row: (Uuid, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO comments (id, review_id, author_id, text, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(review_id)
        .bind(author.id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("failed to create comment", e))?;

        Ok(Comment {
            id: row.0,
            text: text.to_string(),
            author: author.username.clone(),
            author_id: author.id,
            review_id,
            pub_date: row.1,
        })
    }

    pub async fn update_comment(&self, comment: &Comment, text: &str) -> Result<Comment> {
        sqlx::query("UPDATE comments SET text = $2 WHERE id = $1")
            .bind(comment.id)
            .bind(text)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to update comment", e))?;

        self.get_comment(comment.review_id, comment.id)
            .await?
            .ok_or_else(|| CatalogError::not_found("comment"))
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete comment", e))?;
        Ok(result.rows_affected() > 0)
    }
}
