use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::extractors::CurrentSession,
    chat::{
        dto::{ChatMessage, ChatResponse, HistoryResponse},
        services,
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/history", get(chat_history))
}

/// Anonymous callers get a reply but nothing is recorded.
#[instrument(skip_all, fields(messages = messages.len(), user_id = session.as_ref().map(|s| s.user.id)))]
pub async fn chat(
    State(state): State<AppState>,
    session: Option<CurrentSession>,
    ApiJson(messages): ApiJson<Vec<ChatMessage>>,
) -> Result<Json<ChatResponse>, AppError> {
    if messages.is_empty() {
        return Err(AppError::BadRequest("messages must not be empty".into()));
    }

    let key = session.as_ref().map(|s| s.token.as_str());
    let exchange = services::exchange(&state, key, messages).await?;

    info!(recorded = key.is_some(), "chat reply sent");
    Ok(Json(ChatResponse {
        assistant_reply: exchange.reply,
        updated_messages: exchange.messages,
        usage: exchange.usage,
    }))
}

#[instrument(skip_all, fields(user_id = session.user.id))]
pub async fn chat_history(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.history.get(&session.token),
    })
}
