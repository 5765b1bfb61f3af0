//! Categories, genres, and titles
//!
//! Categories and genres share one shape: a named reference entity keyed
//! externally by slug. Titles hold an optional category, any number of
//! genres, and a derived rating (floor of the mean review score) that is
//! recomputed on every read and never stored.

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::FieldError;

const NAME_MAX_LEN: usize = 256;
const SLUG_MAX_LEN: usize = 50;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));

/// A category or genre: which one is decided by [`TermKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Selects the backing table for the shared term repository and handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Category,
    Genre,
}

impl TermKind {
    pub fn table(&self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Genre => "genres",
        }
    }

    /// Singular noun for error messages.
    pub fn noun(&self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Genre => "genre",
        }
    }
}

/// Write payload for categories and genres.
#[derive(Debug, Clone, Deserialize)]
pub struct TermWrite {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl TermWrite {
    pub fn validate(&self) -> std::result::Result<(String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = match self.name.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("name", "this field is required"));
                None
            }
            Some(name) if name.len() > NAME_MAX_LEN => {
                errors.push(FieldError::new(
                    "name",
                    format!("at most {} characters allowed", NAME_MAX_LEN),
                ));
                None
            }
            Some(name) => Some(name.to_string()),
        };

        let slug = match self.slug.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("slug", "this field is required"));
                None
            }
            Some(slug) => {
                if slug.len() > SLUG_MAX_LEN {
                    errors.push(FieldError::new(
                        "slug",
                        format!("at most {} characters allowed", SLUG_MAX_LEN),
                    ));
                }
                if !SLUG_RE.is_match(slug) {
                    errors.push(FieldError::new(
                        "slug",
                        "only letters, digits, hyphens and underscores are allowed",
                    ));
                }
                Some(slug.to_string())
            }
        };

        match (name, slug) {
            (Some(n), Some(s)) if errors.is_empty() => Ok((n, s)),
            _ => Err(errors),
        }
    }
}

/// Read model for a title: category and genres expanded, rating derived.
#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub id: Uuid,
    pub name: String,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category: Option<Term>,
    pub genre: Vec<Term>,
    /// Floor of the mean review score, `null` while the title has no reviews
    pub rating: Option<i32>,
}

/// Write payload for titles. Category and genres are referenced by slug and
/// resolved (or rejected) at the repository boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleWrite {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

impl TitleWrite {
    /// Field-level checks that need no storage access. `require_name`
    /// distinguishes create (true) from partial update (false).
    pub fn validate(&self, require_name: bool) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        match self.name.as_deref().map(str::trim) {
            None if require_name => {
                errors.push(FieldError::new("name", "this field is required"));
            }
            Some("") => errors.push(FieldError::new("name", "this field is required")),
            Some(name) if name.len() > NAME_MAX_LEN => errors.push(FieldError::new(
                "name",
                format!("at most {} characters allowed", NAME_MAX_LEN),
            )),
            _ => {}
        }

        if let Some(year) = self.year {
            let current = Utc::now().year();
            if year > current {
                errors.push(FieldError::new(
                    "year",
                    format!("year must not be later than {}", current),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Optional, combinable filters for the title listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Category slug
    pub category: Option<String>,
    /// Genre slug
    pub genre: Option<String>,
    /// Name substring, case-insensitive
    pub name: Option<String>,
    pub year: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
