//! Reviews and their comments, nested under titles
//!
//! Every handler resolves the full path chain before touching the target
//! resource: a review fetched through the wrong title, or a comment through
//! the wrong review, is not found rather than forbidden. Editing is
//! owner-only; deleting is open to the owner and to moderator tier and up.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use revue_core::api_types::{ListParams, Page};
use revue_core::rbac::{self, Access};
use revue_core::review::{Comment, CommentWrite, Review, ReviewWrite};
use revue_core::user::User;

use crate::auth::middleware::{CurrentUser, require_user};
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

async fn require_title(state: &AppState, title_id: Uuid) -> Result<(), AppError> {
    if state.titles.exists(title_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("title not found"))
    }
}

async fn require_review(
    state: &AppState,
    title_id: Uuid,
    review_id: Uuid,
) -> Result<Review, AppError> {
    require_title(state, title_id).await?;
    state
        .reviews
        .get(title_id, review_id)
        .await?
        .ok_or_else(|| AppError::not_found("review not found"))
}

async fn require_comment(
    state: &AppState,
    title_id: Uuid,
    review_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, AppError> {
    require_review(state, title_id, review_id).await?;
    state
        .reviews
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))
}

fn require_owner(user: &User, owner_id: Uuid) -> Result<(), AppError> {
    if user.id == owner_id {
        Ok(())
    } else {
        Err(AppError::forbidden("only the author may edit this"))
    }
}

fn require_delete_rights(user: &User, owner_id: Uuid) -> Result<(), AppError> {
    if rbac::review_comment_policy(Some(user), Access::Mutate, owner_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("insufficient permissions"))
    }
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(title_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Review>>> {
    require_title(&state, title_id).await?;
    let (count, results) = state
        .reviews
        .list_for_title(title_id, params.limit(), params.offset())
        .await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(title_id): Path<Uuid>,
    Json(write): Json<ReviewWrite>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let user = require_user(&current)?;
    require_title(&state, title_id).await?;
    write.validate(true).map_err(AppError::validation)?;

    // validate(true) guarantees both fields are present.
    let text = write.text.as_deref().map(str::trim).unwrap_or_default();
    let score = write.score.unwrap_or_default();

    let review = state.reviews.create(title_id, user, text, score).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Review>> {
    let review = require_review(&state, title_id, review_id).await?;
    Ok(Json(review))
}

pub async fn patch_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(write): Json<ReviewWrite>,
) -> AppResult<Json<Review>> {
    let user = require_user(&current)?;
    let review = require_review(&state, title_id, review_id).await?;
    require_owner(user, review.author_id)?;
    write.validate(false).map_err(AppError::validation)?;

    let updated = state
        .reviews
        .update(&review, write.text.as_deref().map(str::trim), write.score)
        .await?;
    Ok(Json(updated))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let user = require_user(&current)?;
    let review = require_review(&state, title_id, review_id).await?;
    require_delete_rights(user, review.author_id)?;

    state.reviews.delete(review.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Comment>>> {
    require_review(&state, title_id, review_id).await?;
    let (count, results) = state
        .reviews
        .list_comments(review_id, params.limit(), params.offset())
        .await?;
    Ok(Json(Page::new(count, results)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id)): Path<(Uuid, Uuid)>,
    Json(write): Json<CommentWrite>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let user = require_user(&current)?;
    require_review(&state, title_id, review_id).await?;
    let text = write.validate().map_err(AppError::validation)?;

    let comment = state.reviews.create_comment(review_id, user, &text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<Json<Comment>> {
    let comment = require_comment(&state, title_id, review_id, comment_id).await?;
    Ok(Json(comment))
}

pub async fn patch_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(write): Json<CommentWrite>,
) -> AppResult<Json<Comment>> {
    let user = require_user(&current)?;
    let comment = require_comment(&state, title_id, review_id, comment_id).await?;
    require_owner(user, comment.author_id)?;
    let text = write.validate().map_err(AppError::validation)?;

    let updated = state.reviews.update_comment(&comment, &text).await?;
    Ok(Json(updated))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((title_id, review_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let user = require_user(&current)?;
    let comment = require_comment(&state, title_id, review_id, comment_id).await?;
    require_delete_rights(user, comment.author_id)?;

    state.reviews.delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
