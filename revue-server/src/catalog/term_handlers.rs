//! Categories and genres: public list with search, admin-only create and
//! delete-by-slug. The two surfaces are identical except for the backing
//! table, so thin route-facing wrappers share one implementation.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use revue_core::api_types::{ListParams, Page};
use revue_core::catalog::{Term, TermKind, TermWrite};
use revue_core::rbac::{self, Access};
use revue_core::user::User;

use crate::auth::middleware::{CurrentUser, require_user};
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

/// Catalog writes: 401 anonymous, 403 below admin tier.
pub(crate) fn require_catalog_write(current: &CurrentUser) -> Result<&User, AppError> {
    let user = require_user(current)?;
    if !rbac::read_only_or_admin(Some(user), Access::Mutate) {
        return Err(AppError::forbidden("admin access required"));
    }
    Ok(user)
}

async fn list_terms(
    state: AppState,
    kind: TermKind,
    params: ListParams,
) -> AppResult<Json<Page<Term>>> {
    let (count, results) = state.terms.list(kind, &params).await?;
    Ok(Json(Page::new(count, results)))
}

async fn create_term(
    state: AppState,
    current: CurrentUser,
    kind: TermKind,
    write: TermWrite,
) -> AppResult<(StatusCode, Json<Term>)> {
    require_catalog_write(&current)?;
    let (name, slug) = write.validate().map_err(AppError::validation)?;
    let term = state.terms.create(kind, &name, &slug).await?;
    Ok((StatusCode::CREATED, Json(term)))
}

async fn delete_term(
    state: AppState,
    current: CurrentUser,
    kind: TermKind,
    slug: String,
) -> AppResult<StatusCode> {
    require_catalog_write(&current)?;
    if state.terms.delete_by_slug(kind, &slug).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("{} not found", kind.noun())))
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Term>>> {
    list_terms(state, TermKind::Category, params).await
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(write): Json<TermWrite>,
) -> AppResult<(StatusCode, Json<Term>)> {
    create_term(state, current, TermKind::Category, write).await
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    delete_term(state, current, TermKind::Category, slug).await
}

pub async fn list_genres(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Term>>> {
    list_terms(state, TermKind::Genre, params).await
}

pub async fn create_genre(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(write): Json<TermWrite>,
) -> AppResult<(StatusCode, Json<Term>)> {
    create_term(state, current, TermKind::Genre, write).await
}

pub async fn delete_genre(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    delete_term(state, current, TermKind::Genre, slug).await
}
