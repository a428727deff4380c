use serde::{Deserialize, Serialize};

/// User record in the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,              // sequential, starts at 1
    pub username: String,     // unique key
    #[serde(skip_serializing)]
    pub password_hash: String, // never exposed in JSON
}
