//! User management: self-service `/users/me` plus the admin-only surface.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use revue_core::api_types::{ListParams, Page};
use revue_core::rbac;
use revue_core::user::{NewUser, SelfPatch, User, UserPatch, UserRole};

use crate::auth::middleware::{CurrentUser, require_user};
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

/// 401 for anonymous callers, 403 for authenticated ones below admin tier.
fn require_admin(current: &CurrentUser) -> Result<&User, AppError> {
    let user = require_user(current)?;
    if !rbac::admin_tier(Some(user)) {
        return Err(AppError::forbidden("admin access required"));
    }
    Ok(user)
}

pub async fn me_get(Extension(current): Extension<CurrentUser>) -> AppResult<Json<User>> {
    let user = require_user(&current)?;
    Ok(Json(user.clone()))
}

/// Self-edit: the payload type has no role or superuser field, so those
/// stay read-only no matter what the body contains.
pub async fn me_patch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(patch): Json<SelfPatch>,
) -> AppResult<Json<User>> {
    let user = require_user(&current)?;
    let patch: UserPatch = patch.into();
    patch.validate().map_err(AppError::validation)?;

    let updated = state
        .users
        .update(&user.username, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(updated))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<User>>> {
    require_admin(&current)?;
    let (count, results) = state.users.list(&params).await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    require_admin(&current)?;
    let (username, email) = request.validate().map_err(AppError::validation)?;

    let user = state
        .users
        .create(
            &username,
            &email,
            request.role.unwrap_or(UserRole::User),
            request.bio.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> AppResult<Json<User>> {
    require_admin(&current)?;
    let user = state
        .users
        .get_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(user))
}

pub async fn patch_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<User>> {
    require_admin(&current)?;
    patch.validate().map_err(AppError::validation)?;

    let user = state
        .users
        .update(&username, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    require_admin(&current)?;
    if state.users.delete(&username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("user not found"))
    }
}
