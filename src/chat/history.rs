use dashmap::DashMap;

use crate::chat::dto::ChatMessage;

/// Per-session conversation log, oldest first.
#[derive(Debug, Default)]
pub struct HistoryStore {
    conversations: DashMap<String, Vec<ChatMessage>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `messages` in order as one batch; concurrent exchanges on the
    /// same key never interleave.
    pub fn append(&self, key: &str, messages: &[ChatMessage]) {
        self.conversations
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(messages);
    }

    pub fn get(&self, key: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(key)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    pub fn clear(&self, key: &str) {
        self.conversations.remove(key);
    }
}
