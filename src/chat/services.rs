use tracing::debug;

use crate::chat::{
    client::ChatError,
    dto::{ChatMessage, Role},
};
use crate::state::AppState;

#[derive(Debug)]
pub struct ChatExchange {
    pub reply: String,
    /// What the client sent followed by the assistant reply.
    pub messages: Vec<ChatMessage>,
    pub usage: Option<serde_json::Value>,
}

/// Prepends the configured system prompt unless the caller supplied one.
pub fn outbound_messages(messages: &[ChatMessage], system_prompt: Option<&str>) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt {
        if !messages.iter().any(|m| m.role == Role::System) {
            out.push(ChatMessage::system(prompt));
        }
    }
    out.extend_from_slice(messages);
    out
}

/// Runs one completion round trip and, when `history_key` is set, records
/// the sent messages and the reply. No store is touched while the upstream
/// call is in flight.
pub async fn exchange(
    state: &AppState,
    history_key: Option<&str>,
    mut messages: Vec<ChatMessage>,
) -> Result<ChatExchange, ChatError> {
    let outbound = outbound_messages(&messages, state.config.chat.system_prompt.as_deref());
    let completion = state.chat.complete(&outbound).await?;

    messages.push(ChatMessage::assistant(completion.content.clone()));
    if let Some(key) = history_key {
        state.history.append(key, &messages);
        debug!(appended = messages.len(), "history updated");
    }

    Ok(ChatExchange {
        reply: completion.content,
        messages,
        usage: completion.usage,
    })
}
