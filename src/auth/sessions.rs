use dashmap::DashMap;
use uuid::Uuid;

/// Session token -> username.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh random token for `username`.
    pub fn create(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), username.to_string());
        token
    }

    pub fn username(&self, token: &str) -> Option<String> {
        self.sessions.get(token).map(|s| s.value().clone())
    }

    /// Returns whether a session was actually removed.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
