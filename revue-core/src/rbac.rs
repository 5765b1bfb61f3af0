//! Authorization tiers and policy functions
//!
//! Every mutation in the API is preceded by one of the pure decision
//! functions in this module. The actor is whatever the auth middleware
//! resolved: `None` for anonymous requests, `Some(user)` otherwise.
//!
//! The tier is computed from the role and the superuser flag together;
//! a superuser is admin-tier no matter what the role column says.

use uuid::Uuid;

use crate::user::{User, UserRole};

/// Computed authorization level of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Anonymous,
    User,
    Moderator,
    Admin,
}

impl Tier {
    /// Derives the tier from the authentication state, role, and superuser
    /// flag. Never modeled as type inheritance.
    pub fn of(actor: Option<&User>) -> Tier {
        match actor {
            None => Tier::Anonymous,
            Some(user) if user.is_superuser => Tier::Admin,
            Some(user) => match user.role {
                UserRole::User => Tier::User,
                UserRole::Moderator => Tier::Moderator,
                UserRole::Admin => Tier::Admin,
            },
        }
    }
}

/// Method class of a request: non-mutating reads are always safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    SafeRead,
    Mutate,
}

/// Public read, admin-tier write. Gates the catalog surface
/// (categories, genres, titles).
pub fn read_only_or_admin(actor: Option<&User>, access: Access) -> bool {
    match access {
        Access::SafeRead => true,
        Access::Mutate => admin_tier(actor),
    }
}

/// Authenticated and (role admin or superuser). Gates the admin-only user
/// management surface.
pub fn admin_tier(actor: Option<&User>) -> bool {
    Tier::of(actor) == Tier::Admin
}

/// Reviews and comments: safe reads for everyone, mutation for the resource
/// owner or any moderator-or-better tier. Anonymous actors are denied
/// mutation outright, before any ownership comparison.
pub fn review_comment_policy(actor: Option<&User>, access: Access, resource_owner: Uuid) -> bool {
    if access == Access::SafeRead {
        return true;
    }
    let Some(user) = actor else {
        return false;
    };
    user.id == resource_owner || Tier::of(Some(user)) >= Tier::Moderator
}
