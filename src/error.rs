//! Handler error type.
//!
//! Every handler returns `Result<T, AppError>`; the response body is
//! `{"detail": "..."}`. Internal failures are logged in full but only a
//! generic message reaches the client.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::services::AuthError;
use crate::chat::client::ChatError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Request body the JSON extractor refused; keeps its status.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },

    /// Completion API failure; status depends on the failure kind.
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Rejected { status, .. } => *status,
            AppError::Chat(e) => e.status(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserExists(_) => AppError::BadRequest("User already exists".into()),
            AuthError::InvalidUsername | AuthError::EmptyPassword => {
                AppError::BadRequest(e.to_string())
            }
            AuthError::Hash(m) => AppError::Internal(m),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Internal(m) => {
                error!(message = %m, "internal server error");
                "internal server error".to_owned()
            }
            AppError::Chat(e) => {
                error!(error = %e, %status, "completion request failed");
                e.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
