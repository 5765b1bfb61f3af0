//! # Revue Core
//!
//! Core library for the Revue catalog API, providing the domain types,
//! authorization policies, and PostgreSQL repositories behind the HTTP
//! surface served by `revue-server`.
//!
//! ## Overview
//!
//! - [`user`]: user accounts, roles, and request payload validation
//! - [`rbac`]: the computed authorization tier and the pure policy functions
//!   consulted before any mutation
//! - [`confirmation`]: deterministic confirmation-code derivation for the
//!   signup / token-exchange handshake
//! - [`catalog`]: categories, genres, and titles with their derived rating
//! - [`review`]: reviews and the comments nested under them
//! - [`database`]: pool construction and the repository implementations
//!
//! Repositories enforce the storage-level invariants (unique slugs, one
//! review per author and title, cascade deletes) and translate constraint
//! violations into the [`error::CatalogError`] taxonomy so callers cannot
//! tell which guard fired.

/// Pagination and search parameters shared across list endpoints
pub mod api_types;

/// Categories, genres, and titles
pub mod catalog;

/// Confirmation-code derivation and verification
pub mod confirmation;

/// Pool construction and PostgreSQL repositories
pub mod database;

/// Domain error taxonomy
pub mod error;

/// Authorization tiers and policy functions
pub mod rbac;

/// Reviews and comments
pub mod review;

/// User accounts and payload validation
pub mod user;

pub use error::{CatalogError, FieldError, Result};
