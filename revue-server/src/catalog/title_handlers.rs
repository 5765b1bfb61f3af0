//! Titles: public list with combinable filters, admin-only writes. The
//! response always carries the expanded category and genre objects plus the
//! derived rating.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use revue_core::api_types::Page;
use revue_core::catalog::{Title, TitleFilter, TitleWrite};

use crate::auth::middleware::CurrentUser;
use crate::catalog::term_handlers::require_catalog_write;
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

pub async fn list_titles(
    State(state): State<AppState>,
    Query(filter): Query<TitleFilter>,
) -> AppResult<Json<Page<Title>>> {
    let (count, results) = state.titles.list(&filter).await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn create_title(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(write): Json<TitleWrite>,
) -> AppResult<(StatusCode, Json<Title>)> {
    require_catalog_write(&current)?;
    write.validate(true).map_err(AppError::validation)?;
    let title = state.titles.create(&write).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn get_title(
    State(state): State<AppState>,
    Path(title_id): Path<Uuid>,
) -> AppResult<Json<Title>> {
    let title = state
        .titles
        .get(title_id)
        .await?
        .ok_or_else(|| AppError::not_found("title not found"))?;
    Ok(Json(title))
}

pub async fn patch_title(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(title_id): Path<Uuid>,
    Json(write): Json<TitleWrite>,
) -> AppResult<Json<Title>> {
    require_catalog_write(&current)?;
    write.validate(false).map_err(AppError::validation)?;
    let title = state
        .titles
        .update(title_id, &write)
        .await?
        .ok_or_else(|| AppError::not_found("title not found"))?;
    Ok(Json(title))
}

pub async fn delete_title(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(title_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_catalog_write(&current)?;
    if state.titles.delete(title_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("title not found"))
    }
}
