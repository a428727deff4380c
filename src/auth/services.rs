use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::{
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::User,
    sessions::SessionStore,
};
use crate::config::PasswordScheme;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user {0:?} already exists")]
    UserExists(String),
    #[error("username must be 1-64 characters without whitespace")]
    InvalidUsername,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^\S{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Registration, credential checks and session lifecycle over the
/// credential and session stores.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: Arc<UserStore>,
    sessions: Arc<SessionStore>,
    scheme: PasswordScheme,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AuthService {
    pub fn new(scheme: PasswordScheme) -> Self {
        Self {
            users: Arc::new(UserStore::new()),
            sessions: Arc::new(SessionStore::new()),
            scheme,
        }
    }

    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(AuthError::InvalidUsername);
        }
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        // Cheap pre-check so duplicates skip the hash; `create` is authoritative.
        if self.users.contains(username) {
            return Err(AuthError::UserExists(username.to_string()));
        }
        let hash = hash_password(self.scheme, password).map_err(|e| AuthError::Hash(e.to_string()))?;
        self.users
            .create(username, &hash)
            .ok_or_else(|| AuthError::UserExists(username.to_string()))
    }

    /// Returns the user only if the username exists and the password matches.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let user = self.users.find_by_username(username.trim())?;
        match verify_password(password, &user.password_hash) {
            Ok(true) => Some(user),
            Ok(false) => None,
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash unreadable");
                None
            }
        }
    }

    pub fn create_session(&self, username: &str) -> String {
        let token = self.sessions.create(username);
        debug!(%username, active = self.sessions.len(), "session created");
        token
    }

    /// Empty if the token is unknown or its user no longer resolves.
    pub fn resolve_session(&self, token: &str) -> Option<User> {
        let username = self.sessions.username(token)?;
        self.users.find_by_username(&username)
    }

    pub fn revoke_session(&self, token: &str) {
        if self.sessions.remove(token) {
            debug!("session revoked");
        }
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.list()
    }

    #[cfg(test)]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
