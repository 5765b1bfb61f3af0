//! User accounts and payload validation
//!
//! A user account is created by signup with nothing but a username and an
//! email address; there are no passwords. "Confirmed" is derived state: it
//! means a confirmation code was exchanged for a bearer token at least once.
//!
//! `code_epoch` is the snapshot value folded into the confirmation-code
//! derivation (see [`crate::confirmation`]). Bumping it invalidates every
//! previously issued code for the account.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::error::FieldError;

/// Username that can never be registered: it is the path segment for the
/// self-service profile endpoint.
pub const RESERVED_USERNAME: &str = "me";

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Role stored on the user record. Orthogonal to the superuser flag; the
/// two are only combined when computing the authorization tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(UserRole::User),
            "moderator" => Some(UserRole::Moderator),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    /// Unique username (`[\w.@+-]+`, at most 150 chars, never "me")
    pub username: String,
    /// Unique email address the confirmation code is delivered to
    pub email: String,
    pub bio: Option<String>,
    pub role: UserRole,
    pub is_superuser: bool,
    /// Set on the first successful token exchange, never cleared
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Snapshot value bound into confirmation codes; never serialized
    #[serde(skip_serializing)]
    pub code_epoch: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

/// Body of `POST /auth/signup`. Fields are optional so that a missing field
/// surfaces as a per-field validation error instead of a body-parse reject.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl SignupRequest {
    /// Validates the payload, returning the normalized (username, email)
    /// pair or every failed check at once.
    pub fn validate(&self) -> std::result::Result<(String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let username = match self.username.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("username", "this field is required"));
                None
            }
            Some(name) => {
                validate_username(name, &mut errors);
                Some(name.to_string())
            }
        };

        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("email", "this field is required"));
                None
            }
            Some(addr) => {
                validate_email(addr, &mut errors);
                Some(addr.to_string())
            }
        };

        match (username, email) {
            (Some(u), Some(e)) if errors.is_empty() => Ok((u, e)),
            _ => Err(errors),
        }
    }
}

/// Body of `POST /auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub confirmation_code: Option<String>,
}

impl TokenRequest {
    pub fn validate(&self) -> std::result::Result<(String, String), Vec<FieldError>> {
        let mut errors = Vec::new();

        let username = match self.username.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("username", "this field is required"));
                None
            }
            Some(name) => Some(name.to_string()),
        };

        let code = match self.confirmation_code.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("confirmation_code", "this field is required"));
                None
            }
            Some(code) => Some(code.to_string()),
        };

        match (username, code) {
            (Some(u), Some(c)) => Ok((u, c)),
            _ => Err(errors),
        }
    }
}

/// Admin-side user creation payload (`POST /users`).
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl NewUser {
    pub fn validate(&self) -> std::result::Result<(String, String), Vec<FieldError>> {
        SignupRequest {
            username: self.username.clone(),
            email: self.email.clone(),
        }
        .validate()
    }
}

/// Admin-side partial update (`PATCH /users/{username}`); may change role.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub role: Option<UserRole>,
}

impl UserPatch {
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if let Some(addr) = self.email.as_deref() {
            validate_email(addr.trim(), &mut errors);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Self-service partial update (`PATCH /users/me`). Deliberately has no
/// role or superuser field: those are read-only for self-edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelfPatch {
    pub email: Option<String>,
    pub bio: Option<String>,
}

impl From<SelfPatch> for UserPatch {
    fn from(patch: SelfPatch) -> Self {
        UserPatch {
            email: patch.email,
            bio: patch.bio,
            role: None,
        }
    }
}

fn validate_username(name: &str, errors: &mut Vec<FieldError>) {
    if name == RESERVED_USERNAME {
        errors.push(FieldError::new(
            "username",
            format!("\"{}\" is a reserved username", RESERVED_USERNAME),
        ));
        return;
    }
    if name.len() > USERNAME_MAX_LEN {
        errors.push(FieldError::new(
            "username",
            format!("at most {} characters allowed", USERNAME_MAX_LEN),
        ));
    }
    if !USERNAME_RE.is_match(name) {
        errors.push(FieldError::new(
            "username",
            "only letters, digits and @/./+/-/_ are allowed",
        ));
    }
}

fn validate_email(addr: &str, errors: &mut Vec<FieldError>) {
    if addr.len() > EMAIL_MAX_LEN || !EMAIL_RE.is_match(addr) {
        errors.push(FieldError::new("email", "enter a valid email address"));
    }
}
