pub mod v1;

use axum::Router;

use crate::infra::app_state::AppState;

/// The full API surface, versioned under `/api/v1`.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", v1::create_v1_router(state.clone()))
        .with_state(state)
}
