//! # Local credential backend
//!
//! The no-network fallback: a credential list and a session marker held
//! entirely in the durable [`KvStore`]. It is what keeps login and
//! registration working when no remote identity service is configured.
//!
//! ## Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `users` | JSON array of `{email, password}` records, unique by email. The `password` field holds an Argon2id PHC string, never the plain text. |
//! | `currentUser` | JSON [`User`] marker for the active session, removed on logout. |
//!
//! Reads degrade: a missing, unreadable, or corrupt value behaves as "no
//! credentials" / "no session" with a logged warning. Writes surface
//! [`StoreError`] to the caller.

use serde::{Deserialize, Serialize};
use store::{KvStore, StoreError};
use tracing::{info, warn};

use crate::error::AuthError;
use crate::password::{hash_password, verify_password};
use crate::session::User;

/// Key holding the credential list.
pub const USERS_KEY: &str = "users";
/// Key holding the persisted session marker.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// A stored credential. `password` is an Argon2id PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    email: String,
    password: String,
}

/// Credential store and session marker over a durable KvStore.
#[derive(Clone, Debug)]
pub struct LocalBackend<S: KvStore> {
    store: S,
}

impl<S: KvStore> LocalBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn credentials(&self) -> Vec<Credential> {
        match self.store.get(USERS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(creds) => creds,
                Err(e) => {
                    warn!(error = %e, "corrupt credential list, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "unreadable credential list, treating as empty");
                Vec::new()
            }
        }
    }

    fn write_credentials(&self, creds: &[Credential]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(creds).map_err(|e| StoreError::Serialize {
            key: USERS_KEY.to_string(),
            source: e,
        })?;
        self.store.set(USERS_KEY, &raw)
    }

    /// Match email and password against the stored credentials.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let creds = self.credentials();
        let found = creds
            .iter()
            .find(|c| c.email == email && verify_password(password, &c.password));
        match found {
            Some(c) => Ok(User::local(&c.email)),
            None => Err(AuthError::InvalidCredentials),
        }
    }

    /// Store a new credential. The email must not already be registered;
    /// a duplicate registration leaves the existing credential untouched.
    pub fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let mut creds = self.credentials();
        if creds.iter().any(|c| c.email == email) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        creds.push(Credential {
            email: email.to_string(),
            password: hash_password(password)?,
        });
        self.write_credentials(&creds)?;
        info!(email, "registered local credential");
        Ok(())
    }

    /// Persist the session marker for the given user.
    pub fn save_session(&self, user: &User) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user).map_err(|e| StoreError::Serialize {
            key: CURRENT_USER_KEY.to_string(),
            source: e,
        })?;
        self.store.set(CURRENT_USER_KEY, &raw)
    }

    /// Read the persisted session marker, if any. Corrupt or unreadable
    /// markers behave as no session.
    pub fn load_session(&self) -> Option<User> {
        match self.store.get(CURRENT_USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "corrupt session marker, ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "unreadable session marker, ignoring");
                None
            }
        }
    }

    /// Remove the persisted session marker.
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.remove(CURRENT_USER_KEY)
    }
}
