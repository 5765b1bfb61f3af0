//! Confirmation-code derivation and verification
//!
//! Codes are never stored. A code is an HMAC-SHA256 over a snapshot of the
//! user's identity and `code_epoch`, keyed by the server secret. Bumping
//! the epoch (done on every successful token exchange) invalidates every
//! code derived from the previous snapshot, which gives the
//! "valid at most once meaningfully" lifecycle without any code table.
//!
//! Both functions are pure over the user snapshot, so the invalidation
//! contract is testable without a database.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::user::User;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], user: &User) -> HmacSha256 {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC key of any length");
    mac.update(user.id.as_bytes());
    mac.update(b":");
    mac.update(user.email.as_bytes());
    mac.update(b":");
    mac.update(user.code_epoch.timestamp_micros().to_be_bytes().as_ref());
    mac
}

/// Derives the confirmation code for the user's current state.
pub fn issue_code(secret: &[u8], user: &User) -> String {
    URL_SAFE_NO_PAD.encode(mac_for(secret, user).finalize().into_bytes())
}

/// Checks a candidate code against the user's current state. Comparison is
/// constant-time via the MAC verifier.
pub fn verify_code(secret: &[u8], user: &User, candidate: &str) -> bool {
    let Ok(raw) = URL_SAFE_NO_PAD.decode(candidate.trim()) else {
        return false;
    };
    mac_for(secret, user).verify_slice(&raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserRole;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    const SECRET: &[u8] = b"unit-test-secret";

    fn some_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            bio: None,
            role: UserRole::User,
            is_superuser: false,
            confirmed_at: None,
            code_epoch: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_code_verifies() {
        let user = some_user();
        let code = issue_code(SECRET, &user);
        assert!(verify_code(SECRET, &user, &code));
    }

    #[test]
    fn wrong_code_is_rejected() {
        let user = some_user();
        assert!(!verify_code(SECRET, &user, "definitely-wrong"));
        assert!(!verify_code(SECRET, &user, ""));
        assert!(!verify_code(SECRET, &user, "!!!not-base64!!!"));
    }

    #[test]
    fn code_is_bound_to_the_user() {
        let alice = some_user();
        let mut bob = some_user();
        bob.id = Uuid::new_v4();
        bob.email = "bob@example.com".to_string();
        let code = issue_code(SECRET, &alice);
        assert!(!verify_code(SECRET, &bob, &code));
    }

    #[test]
    fn bumping_the_epoch_invalidates_prior_codes() {
        let mut user = some_user();
        let code = issue_code(SECRET, &user);
        user.code_epoch += Duration::seconds(1);
        assert!(!verify_code(SECRET, &user, &code));
        // A fresh code for the new snapshot verifies again.
        let fresh = issue_code(SECRET, &user);
        assert!(verify_code(SECRET, &user, &fresh));
    }

    #[test]
    fn code_is_bound_to_the_secret() {
        let user = some_user();
        let code = issue_code(SECRET, &user);
        assert!(!verify_code(b"another-secret", &user, &code));
    }
}
