use axum::{response::Redirect, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, chat};

pub fn build_app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .merge(auth::router())
        .merge(chat::router())
        .route("/", get(|| async { Redirect::temporary("/static/login.html") }))
        .route("/health", get(|| async { "ok" }))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{
        client::{ChatError, Completion, CompletionClient},
        dto::ChatMessage,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Reply {
        status: StatusCode,
        set_cookie: Option<String>,
        location: Option<String>,
        body: Value,
    }

    async fn call(app: &Router, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        let req = match body {
            Some(v) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let header_str = |name: header::HeaderName| {
            res.headers()
                .get(name)
                .map(|v: &header::HeaderValue| v.to_str().unwrap().to_string())
        };
        let set_cookie = header_str(header::SET_COOKIE);
        let location = header_str(header::LOCATION);
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            set_cookie,
            location,
            body,
        }
    }

    fn creds(username: &str, password: &str) -> Option<Value> {
        Some(json!({ "username": username, "password": password }))
    }

    /// Registers and logs in, returning the `session_id=...` pair to send back.
    async fn login_as(app: &Router, username: &str) -> String {
        let r = call(app, "POST", "/register", None, creds(username, "pw")).await;
        assert_eq!(r.status, StatusCode::OK);
        let r = call(app, "POST", "/login", None, creds(username, "pw")).await;
        assert_eq!(r.status, StatusCode::OK);
        let set_cookie = r.set_cookie.expect("login sets a cookie");
        set_cookie.split(';').next().unwrap().to_string()
    }

    struct Failing(fn() -> ChatError);

    #[async_trait::async_trait]
    impl CompletionClient for Failing {
        async fn complete(&self, _: &[ChatMessage]) -> Result<Completion, ChatError> {
            Err((self.0)())
        }
    }

    #[tokio::test]
    async fn register_twice_is_rejected_and_keeps_one_user() {
        let app = build_app(AppState::fake());

        let first = call(&app, "POST", "/register", None, creds("alice", "pw")).await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["user"], json!({"id": 1, "username": "alice"}));

        let second = call(&app, "POST", "/register", None, creds("alice", "other")).await;
        assert_eq!(second.status, StatusCode::BAD_REQUEST);
        assert!(second.body["detail"].is_string());

        let users = call(&app, "GET", "/users", None, None).await;
        assert_eq!(users.body, json!({"count": 1, "users": [{"id": 1, "username": "alice"}]}));
    }

    #[tokio::test]
    async fn login_sets_http_only_session_cookie() {
        let app = build_app(AppState::fake());
        call(&app, "POST", "/register", None, creds("bob", "pw")).await;

        let r = call(&app, "POST", "/login", None, creds("bob", "pw")).await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.body["user"], json!({"id": 1, "username": "bob"}));
        let cookie = r.set_cookie.unwrap();
        assert!(cookie.starts_with("session_id="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[tokio::test]
    async fn bad_credentials_are_401() {
        let app = build_app(AppState::fake());
        call(&app, "POST", "/register", None, creds("bob", "pw")).await;

        let wrong = call(&app, "POST", "/login", None, creds("bob", "nope")).await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert!(wrong.set_cookie.is_none());
        let unknown = call(&app, "POST", "/login", None, creds("nobody", "pw")).await;
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.body, unknown.body);
    }

    #[tokio::test]
    async fn me_requires_a_live_session() {
        let app = build_app(AppState::fake());

        let none = call(&app, "GET", "/me", None, None).await;
        assert_eq!(none.status, StatusCode::UNAUTHORIZED);
        let bogus = call(&app, "GET", "/me", Some("session_id=forged"), None).await;
        assert_eq!(bogus.status, StatusCode::UNAUTHORIZED);

        let cookie = login_as(&app, "carol").await;
        let me = call(&app, "GET", "/me", Some(&cookie), None).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body, json!({"id": 1, "username": "carol"}));
    }

    #[tokio::test]
    async fn logout_revokes_session_and_clears_cookie() {
        let app = build_app(AppState::fake());
        let cookie = login_as(&app, "dan").await;

        let out = call(&app, "POST", "/logout", Some(&cookie), None).await;
        assert_eq!(out.status, StatusCode::OK);
        let removal = out.set_cookie.unwrap();
        assert!(removal.starts_with("session_id="));
        assert!(removal.contains("Max-Age=0"));

        let me = call(&app, "GET", "/me", Some(&cookie), None).await;
        assert_eq!(me.status, StatusCode::UNAUTHORIZED);

        let anon = call(&app, "POST", "/logout", None, None).await;
        assert_eq!(anon.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_drops_that_sessions_history() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let cookie = login_as(&app, "gina").await;
        let token = cookie.trim_start_matches("session_id=").to_string();

        call(&app, "POST", "/chat", Some(&cookie), Some(json!([{"role": "user", "content": "hi"}]))).await;
        assert_eq!(state.history.get(&token).len(), 2);

        let out = call(&app, "POST", "/logout", Some(&cookie), None).await;
        assert_eq!(out.status, StatusCode::OK);
        assert!(state.history.get(&token).is_empty());
    }

    #[tokio::test]
    async fn malformed_bodies_still_answer_with_detail() {
        let app = build_app(AppState::fake());

        let missing = call(&app, "POST", "/register", None, Some(json!({"username": "a"}))).await;
        assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(missing.body["detail"].as_str().unwrap().contains("password"));

        let bad_role = call(&app, "POST", "/chat", None, Some(json!([{"role": "wizard", "content": "hi"}]))).await;
        assert_eq!(bad_role.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(bad_role.body["detail"].is_string());

        let req = Request::builder()
            .method("POST")
            .uri("/login")
            .body(Body::from(r#"{"username":"a","password":"b"}"#))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn chat_history_accumulates_in_call_order() {
        let app = build_app(AppState::fake());
        let cookie = login_as(&app, "erin").await;

        let first = call(
            &app,
            "POST",
            "/chat",
            Some(&cookie),
            Some(json!([{"role": "user", "content": "Recommend a heist film"}])),
        )
        .await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["assistant_reply"], "echo: Recommend a heist film");
        assert_eq!(first.body["updated_messages"].as_array().unwrap().len(), 2);

        call(
            &app,
            "POST",
            "/chat",
            Some(&cookie),
            Some(json!([{"role": "user", "content": "Something shorter"}])),
        )
        .await;

        let history = call(&app, "GET", "/chat/history", Some(&cookie), None).await;
        assert_eq!(history.status, StatusCode::OK);
        assert_eq!(
            history.body["history"],
            json!([
                {"role": "user", "content": "Recommend a heist film"},
                {"role": "assistant", "content": "echo: Recommend a heist film"},
                {"role": "user", "content": "Something shorter"},
                {"role": "assistant", "content": "echo: Something shorter"},
            ])
        );
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let app = build_app(AppState::fake());
        let a = login_as(&app, "a").await;
        let b = login_as(&app, "b").await;

        call(&app, "POST", "/chat", Some(&a), Some(json!([{"role": "user", "content": "hi"}]))).await;

        let hist_b = call(&app, "GET", "/chat/history", Some(&b), None).await;
        assert_eq!(hist_b.body, json!({"history": []}));
    }

    #[tokio::test]
    async fn anonymous_chat_is_answered_but_not_recorded() {
        let app = build_app(AppState::fake());

        let r = call(&app, "POST", "/chat", None, Some(json!([{"role": "user", "content": "hi"}]))).await;
        assert_eq!(r.status, StatusCode::OK);
        assert_eq!(r.body["assistant_reply"], "echo: hi");

        let stale = call(
            &app,
            "POST",
            "/chat",
            Some("session_id=stale"),
            Some(json!([{"role": "user", "content": "hi"}])),
        )
        .await;
        assert_eq!(stale.status, StatusCode::OK);

        let history = call(&app, "GET", "/chat/history", None, None).await;
        assert_eq!(history.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_message_list_is_400() {
        let app = build_app(AppState::fake());
        let r = call(&app, "POST", "/chat", None, Some(json!([]))).await;
        assert_eq!(r.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failures_surface_with_distinct_statuses() {
        let cases: [(fn() -> ChatError, StatusCode); 3] = [
            (|| ChatError::Timeout, StatusCode::REQUEST_TIMEOUT),
            (|| ChatError::Upstream { status: 503 }, StatusCode::SERVICE_UNAVAILABLE),
            (|| ChatError::Malformed("no choices".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (make, expected) in cases {
            let app = build_app(AppState::fake_with(Arc::new(Failing(make))));
            let cookie = login_as(&app, "frank").await;

            let r = call(&app, "POST", "/chat", Some(&cookie), Some(json!([{"role": "user", "content": "hi"}]))).await;
            assert_eq!(r.status, expected);
            assert!(!r.body["detail"].as_str().unwrap().is_empty());

            // a failed exchange leaves no trace in the history
            let history = call(&app, "GET", "/chat/history", Some(&cookie), None).await;
            assert_eq!(history.body, json!({"history": []}));
        }
    }

    #[tokio::test]
    async fn root_redirects_to_login_page_and_health_is_ok() {
        let app = build_app(AppState::fake());

        let root = call(&app, "GET", "/", None, None).await;
        assert_eq!(root.status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(root.location.as_deref(), Some("/static/login.html"));

        let health = call(&app, "GET", "/health", None, None).await;
        assert_eq!(health.status, StatusCode::OK);
    }
}
