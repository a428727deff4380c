use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::auth::{repo_types::User, services::AuthService};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session_id";

/// Resolves the `session_id` cookie to a logged-in user.
///
/// Use `Option<CurrentSession>` on routes where a session is optional.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Login required".into()))?;

        let auth = AuthService::from_ref(state);
        let Some(user) = auth.resolve_session(&token) else {
            warn!("unknown or revoked session");
            return Err(AppError::Unauthorized(
                "Invalid session, please log in again".into(),
            ));
        };

        Ok(CurrentSession { token, user })
    }
}
