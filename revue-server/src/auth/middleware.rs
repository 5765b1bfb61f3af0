use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use revue_core::user::User;

use crate::infra::app_state::AppState;
use crate::infra::errors::AppError;

/// Actor resolved for the request: `None` for anonymous callers. Inserted
/// for every request, so handlers can always extract it.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

/// Resolves the actor. No credentials means anonymous; presented-but-bad
/// credentials are rejected outright, even on endpoints with public reads.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = match bearer_token(&request) {
        None => CurrentUser(None),
        Some(token) => {
            let claims = state
                .jwt
                .verify(&token)
                .map_err(|_| AppError::unauthorized("invalid or expired token"))?;
            let user = state
                .users
                .get_by_id(claims.sub)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;
            CurrentUser(Some(user))
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// 401 unless the actor is authenticated.
pub fn require_user(current: &CurrentUser) -> Result<&User, AppError> {
    current
        .0
        .as_ref()
        .ok_or_else(|| AppError::unauthorized("authentication required"))
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
