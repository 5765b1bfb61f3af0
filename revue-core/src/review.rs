//! Reviews and comments
//!
//! One review per (author, title): enforced twice, with a friendly
//! existence pre-check in the repository and the `one_review_per_title`
//! unique constraint as the authoritative guard under concurrent creates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldError;

pub const SCORE_MIN: i32 = 1;
pub const SCORE_MAX: i32 = 10;

/// Message used by both uniqueness guards so callers cannot tell which one
/// fired.
pub const ONE_REVIEW_PER_TITLE: &str = "you have already reviewed this title";

/// A review of a title. The author is exposed by username; the author id is
/// kept for ownership checks but never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub text: String,
    pub score: i32,
    /// Author username
    pub author: String,
    #[serde(skip_serializing)]
    pub author_id: Uuid,
    #[serde(skip_serializing)]
    pub title_id: Uuid,
    pub pub_date: DateTime<Utc>,
}

/// A comment under a review. Same ownership shape as [`Review`].
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub text: String,
    pub author: String,
    #[serde(skip_serializing)]
    pub author_id: Uuid,
    #[serde(skip_serializing)]
    pub review_id: Uuid,
    pub pub_date: DateTime<Utc>,
}

/// Write payload for reviews (create and partial update share it; create
/// requires both fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewWrite {
    pub text: Option<String>,
    pub score: Option<i32>,
}

impl ReviewWrite {
    pub fn validate(&self, require_all: bool) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        match self.text.as_deref().map(str::trim) {
            None if require_all => errors.push(FieldError::new("text", "this field is required")),
            Some("") => errors.push(FieldError::new("text", "this field is required")),
            _ => {}
        }

        match self.score {
            None if require_all => errors.push(FieldError::new("score", "this field is required")),
            Some(score) if !(SCORE_MIN..=SCORE_MAX).contains(&score) => {
                errors.push(FieldError::new(
                    "score",
                    format!("score must be between {} and {}", SCORE_MIN, SCORE_MAX),
                ));
            }
            _ => {}
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Write payload for comments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentWrite {
    pub text: Option<String>,
}

impl CommentWrite {
    pub fn validate(&self) -> std::result::Result<String, Vec<FieldError>> {
        match self.text.as_deref().map(str::trim) {
            None | Some("") => Err(vec![FieldError::new("text", "this field is required")]),
            Some(text) => Ok(text.to_string()),
        }
    }
}
