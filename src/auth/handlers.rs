use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest, UsersResponse},
        extractors::{CurrentSession, SESSION_COOKIE},
    },
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/users", get(list_users))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.auth.register(&payload.username, &payload.password)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(AuthResponse {
        message: "Registration complete".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, jar, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Some(user) = state.auth.authenticate(&payload.username, &payload.password) else {
        warn!("login rejected");
        return Err(AppError::Unauthorized("Invalid username or password".into()));
    };

    let token = state.auth.create_session(&user.username);
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(Duration::seconds(state.config.session.max_age_secs));

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            message: "Login successful".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.auth.revoke_session(&token);
        state.history.clear(&token);
        info!("user logged out");
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out".into(),
        }),
    )
}

#[instrument(skip_all, fields(user_id = session.user.id))]
pub async fn get_me(session: CurrentSession) -> Json<PublicUser> {
    Json(session.user.into())
}

/// Unauthenticated. Exposes ids and usernames only.
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Json<UsersResponse> {
    let users: Vec<PublicUser> = state
        .auth
        .list_users()
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Json(UsersResponse {
        count: users.len(),
        users,
    })
}
