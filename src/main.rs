mod app;
mod auth;
mod chat;
mod config;
mod error;
mod extract;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "moviebot=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init()?;
    let addr = app_state.config.bind_addr();
    tracing::info!(
        chat_api = %app_state.config.chat.api_url,
        password_scheme = ?app_state.config.password_scheme,
        "state initialised"
    );

    let app = app::build_app(app_state);
    app::serve(app, &addr).await
}
