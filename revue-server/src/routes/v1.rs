use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    auth,
    catalog::{term_handlers, title_handlers},
    infra::app_state::AppState,
    reviews::handlers as review_handlers,
    users::handlers as user_handlers,
};

/// Create all v1 API routes. Every route runs behind the authentication
/// middleware, which resolves the bearer token to a user (or to anonymous)
/// and leaves the policy decisions to the handlers.
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Signup and the code → token exchange
        .route("/auth/signup", post(auth::handlers::signup))
        .route("/auth/token", post(auth::handlers::token))
        // Self-service profile
        .route(
            "/users/me",
            get(user_handlers::me_get).patch(user_handlers::me_patch),
        )
        // Admin-only user management
        .route(
            "/users",
            get(user_handlers::list_users).post(user_handlers::create_user),
        )
        .route(
            "/users/{username}",
            get(user_handlers::get_user)
                .patch(user_handlers::patch_user)
                .delete(user_handlers::delete_user),
        )
        // Catalog: categories and genres, keyed by slug
        .route(
            "/categories",
            get(term_handlers::list_categories).post(term_handlers::create_category),
        )
        .route(
            "/categories/{slug}",
            axum::routing::delete(term_handlers::delete_category),
        )
        .route(
            "/genres",
            get(term_handlers::list_genres).post(term_handlers::create_genre),
        )
        .route(
            "/genres/{slug}",
            axum::routing::delete(term_handlers::delete_genre),
        )
        // Catalog: titles
        .route(
            "/titles",
            get(title_handlers::list_titles).post(title_handlers::create_title),
        )
        .route(
            "/titles/{title_id}",
            get(title_handlers::get_title)
                .patch(title_handlers::patch_title)
                .delete(title_handlers::delete_title),
        )
        // Reviews nested under titles
        .route(
            "/titles/{title_id}/reviews",
            get(review_handlers::list_reviews).post(review_handlers::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(review_handlers::get_review)
                .patch(review_handlers::patch_review)
                .delete(review_handlers::delete_review),
        )
        // Comments nested under reviews
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(review_handlers::list_comments).post(review_handlers::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(review_handlers::get_comment)
                .patch(review_handlers::patch_comment)
                .delete(review_handlers::delete_comment),
        )
        .layer(middleware::from_fn_with_state(
            state,
            auth::middleware::authenticate,
        ))
}
