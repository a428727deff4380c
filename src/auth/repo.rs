use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::auth::repo_types::User;

/// In-memory credential store keyed by username.
#[derive(Debug)]
pub struct UserStore {
    users: DashMap<String, User>,
    next_id: AtomicI64,
}

impl Default for UserStore {
    fn default() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a user by username.
    pub fn find_by_username(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|u| u.value().clone())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Insert a new user with an already hashed password. Returns `None` if
    /// the username is taken; the id counter only advances on success.
    pub fn create(&self, username: &str, password_hash: &str) -> Option<User> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                };
                slot.insert(user.clone());
                Some(user)
            }
        }
    }

    /// All users ordered by id.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.users.len()
    }
}
