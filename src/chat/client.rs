//! Outbound client for the completion API.
//!
//! One POST per call, no retries and no streaming. Every failure is mapped
//! to a [`ChatError`] variant with its own HTTP status so callers can tell a
//! timeout from an upstream rejection or a garbled answer.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chat::dto::ChatMessage;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("completion API request timed out")]
    Timeout,
    #[error("completion API returned status {status}")]
    Upstream { status: u16 },
    #[error("unexpected completion API response: {0}")]
    Malformed(String),
    #[error("completion API unreachable: {0}")]
    Transport(String),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::Timeout => StatusCode::REQUEST_TIMEOUT,
            // Only error statuses are relayed; anything else is a bad gateway.
            ChatError::Upstream { status } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ChatError::Malformed(_) | ChatError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Transport(e.to_string())
        }
    }
}

/// Assistant reply plus the provider's token accounting, if it sent any.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<serde_json::Value>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError>;
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    api_url: String,
}

impl HttpCompletionClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError> {
        let resp = self
            .http
            .post(&self.api_url)
            .json(messages)
            .send()
            .await
            .map_err(ChatError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %body, "completion API rejected request");
            return Err(ChatError::Upstream {
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(ChatError::from_transport)?;
        let body: CompletionBody =
            serde_json::from_slice(&bytes).map_err(|e| ChatError::Malformed(e.to_string()))?;
        let Some(first) = body.choices.into_iter().next() else {
            return Err(ChatError::Malformed("no choices in response".into()));
        };

        debug!(messages = messages.len(), "completion received");
        Ok(Completion {
            content: first.message.content,
            usage: body.usage,
        })
    }
}
