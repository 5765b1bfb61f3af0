//! # Revue Server
//!
//! HTTP surface of the Revue catalog: signup with emailed confirmation
//! codes, code → token exchange, role-based user management, the
//! category/genre/title catalog, and reviews with comments.
//!
//! Built on Axum over PostgreSQL. All domain logic lives in `revue-core`;
//! this crate wires it to routes, auth middleware, and configuration.

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub mod auth;
pub mod catalog;
pub mod infra;
pub mod reviews;
pub mod routes;
pub mod users;

pub use infra::app_state::AppState;
pub use infra::config::Config;
pub use routes::create_api_router;
