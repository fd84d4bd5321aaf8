//! Password hashing and session management
//!
//! Sessions are process-local: a login mints a UUID token mapped to the
//! session record in memory, and the token travels in a cookie. Restarting
//! the service logs everyone out, which is acceptable for an internal tool.

use crate::error::{Error, Result};
use crate::storage::UserRecord;
use crate::types::UserRole;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand_core::OsRng;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "peopledesk_session";

/// Hash a password with Argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::auth(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Malformed hashes verify as false rather than erroring, so a corrupted row
/// reads as a failed login.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    /// Row id of the user
    pub user_id: i64,
    /// Login name
    pub username: String,
    /// Role the user signed up with
    pub role: UserRole,
    /// When the session was created
    pub created_at: DateTime<Utc>,
}

/// In-memory session store keyed by token
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a user, returning the token
    pub fn create(&self, user: &UserRecord) -> Result<Uuid> {
        let role = user.role.parse::<UserRole>()?;
        let token = Uuid::new_v4();
        self.sessions.insert(
            token,
            Session {
                user_id: user.id,
                username: user.username.clone(),
                role,
                created_at: Utc::now(),
            },
        );
        Ok(token)
    }

    /// Look up the session for a token
    pub fn get(&self, token: &Uuid) -> Option<Session> {
        self.sessions.get(token).map(|entry| entry.clone())
    }

    /// Remove a session, returning whether it existed
    pub fn remove(&self, token: &Uuid) -> bool {
        self.sessions.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> UserRecord {
        UserRecord {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "unused".to_string(),
            role: role.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_malformed_hash_fails_verification() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new();
        let token = store.create(&user("employee")).unwrap();

        let session = store.get(&token).unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::Employee);

        assert!(store.remove(&token));
        assert!(store.get(&token).is_none());
        assert!(!store.remove(&token));
    }

    #[test]
    fn test_invalid_role_rejected_at_login() {
        let store = SessionStore::new();
        assert!(store.create(&user("superuser")).is_err());
    }
}
