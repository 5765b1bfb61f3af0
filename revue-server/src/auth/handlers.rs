//! Signup and the confirmation-code → token exchange
//!
//! Signup creates the account and emails a confirmation code derived from
//! the account's current state. The token endpoint checks the code against
//! the same derivation and mints a bearer token; a successful exchange
//! bumps the code epoch, so the code cannot be exchanged twice.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use revue_core::confirmation;
use revue_core::user::{SignupRequest, TokenRequest, User, UserRole};

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};
use crate::infra::mail::Mailer;

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    let (username, email) = request.validate().map_err(AppError::validation)?;

    let user = match state.users.get_by_username(&username).await? {
        // Re-posting the identical pair resends the code for an account
        // that never completed the exchange.
        Some(existing) if existing.email == email => existing,
        Some(_) => {
            return Err(AppError::from(revue_core::CatalogError::invalid(
                "username",
                "a user with this username already exists",
            )));
        }
        None => {
            if state.users.get_by_email(&email).await?.is_some() {
                return Err(AppError::from(revue_core::CatalogError::invalid(
                    "email",
                    "a user with this email already exists",
                )));
            }
            // The insert still translates unique violations: two racing
            // signups cannot both pass the checks above.
            state
                .users
                .create(&username, &email, UserRole::User, None)
                .await?
        }
    };

    deliver_code(&state, &user);

    Ok(Json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

pub async fn token(
    State(state): State<AppState>,
    Json(request): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let (username, code) = request.validate().map_err(AppError::validation)?;

    let user = state
        .users
        .get_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if !confirmation::verify_code(state.code_secret(), &user, &code) {
        // A wrong code is a domain-level rejection; nothing was mutated.
        return Err(AppError::bad_request("invalid confirmation code"));
    }

    // Consuming the code: bump the epoch so this code can never be
    // exchanged again, and record the confirmation.
    state.users.mark_confirmed(user.id).await?;

    let token = state
        .jwt
        .mint(user.id)
        .map_err(|_| AppError::internal("failed to mint access token"))?;

    Ok(Json(TokenResponse { token }))
}

/// Fire-and-forget delivery of the confirmation code. A transport failure
/// is logged and deliberately does not fail the signup; the caller can
/// re-post the same payload to trigger another delivery.
fn deliver_code(state: &AppState, user: &User) {
    let code = confirmation::issue_code(state.code_secret(), user);
    let mailer: Arc<dyn Mailer> = state.mailer.clone();
    let recipient = user.email.clone();
    let username = user.username.clone();

    tokio::spawn(async move {
        let message = format!("Your confirmation code is {}", code);
        if let Err(error) = mailer
            .send("Your Revue confirmation code", &message, &recipient)
            .await
        {
            warn!(%username, %error, "failed to deliver confirmation code");
        }
    });
}
