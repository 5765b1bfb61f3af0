use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{storage_error, violated_constraint};
use crate::api_types::ListParams;
use crate::error::{CatalogError, Result};
use crate::user::{User, UserPatch, UserRole};

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    bio: Option<String>,
    role: String,
    is_superuser: bool,
    confirmed_at: Option<DateTime<Utc>>,
    code_epoch: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            bio: row.bio,
            // The column carries a CHECK constraint; an unknown value would
            // mean a schema drift, which must not take the row down with it.
            role: UserRole::parse(&row.role).unwrap_or_default(),
            is_superuser: row.is_superuser,
            confirmed_at: row.confirmed_at,
            code_epoch: row.code_epoch,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, bio, role, is_superuser, confirmed_at, code_epoch, created_at";

/// PostgreSQL-backed store for user accounts.
#[derive(Debug, Clone)]
pub struct UsersRepository {
    pool: PgPool,
}

impl UsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new account. Unique violations on username or email are
    /// translated into per-field validation errors, identical to what the
    /// pre-checks in the signup handler produce, so the race backstop is
    /// indistinguishable from the friendly path.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        role: UserRole,
        bio: Option<&str>,
    ) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, username, email, bio, role, is_superuser, code_epoch, created_at) \
             VALUES ($1, $2, $3, $4, $5, FALSE, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(bio)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("users_username_key") => {
                CatalogError::invalid("username", "a user with this username already exists")
            }
            Some("users_email_key") => {
                CatalogError::invalid("email", "a user with this email already exists")
            }
            _ => storage_error("failed to create user", e),
        })?;

        info!(username = %row.username, id = %row.id, "created user");
        Ok(row.into())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get user by id", e))?;
        Ok(row.map(Into::into))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get user by username", e))?;
        Ok(row.map(Into::into))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("failed to get user by email", e))?;
        Ok(row.map(Into::into))
    }

    /// Lists users ordered by username, with an optional username substring
    /// search.
    pub async fn list(&self, params: &ListParams) -> Result<(i64, Vec<User>)> {
        let pattern = params.search().map(|s| format!("%{}%", s));

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR username ILIKE $1)",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("failed to count users", e))?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::TEXT IS NULL OR username ILIKE $1) \
             ORDER BY username \
             LIMIT $2 OFFSET $3"
        ))
        .bind(pattern.as_deref())
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("failed to list users", e))?;

        Ok((count, rows.into_iter().map(Into::into).collect()))
    }

    /// Partial update; absent fields keep their stored value. Returns `None`
    /// when no such user exists.
    pub async fn update(&self, username: &str, patch: &UserPatch) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
               email = COALESCE($2, email), \
               bio = COALESCE($3, bio), \
               role = COALESCE($4, role) \
             WHERE username = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(patch.email.as_deref().map(str::trim))
        .bind(patch.bio.as_deref())
        .bind(patch.role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("users_email_key") => {
                CatalogError::invalid("email", "a user with this email already exists")
            }
            _ => storage_error("failed to update user", e),
        })?;
        Ok(row.map(Into::into))
    }

    pub async fn delete(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("failed to delete user", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Records a successful token exchange: sets `confirmed_at` on first use
    /// and bumps `code_epoch`, invalidating every previously issued code.
    pub async fn mark_confirmed(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
               confirmed_at = COALESCE(confirmed_at, NOW()), \
               code_epoch = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("failed to mark user confirmed", e))?;
        Ok(())
    }
}
