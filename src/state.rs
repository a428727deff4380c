use crate::auth::services::AuthService;
use crate::chat::client::{CompletionClient, HttpCompletionClient};
use crate::chat::history::HistoryStore;
use crate::config::AppConfig;
use std::sync::Arc;

/// Everything a handler can reach. Built once at startup; stores are empty
/// and live for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub history: Arc<HistoryStore>,
    pub chat: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let chat = Arc::new(HttpCompletionClient::new(
            config.chat.api_url.clone(),
            config.chat.timeout(),
        )?) as Arc<dyn CompletionClient>;

        Ok(Self::from_parts(config, chat))
    }

    pub fn from_parts(config: AppConfig, chat: Arc<dyn CompletionClient>) -> Self {
        Self {
            auth: AuthService::new(config.password_scheme),
            history: Arc::new(HistoryStore::new()),
            config: Arc::new(config),
            chat,
        }
    }

    /// Fresh state whose completion client echoes the last message.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::chat::{
            client::{ChatError, Completion},
            dto::ChatMessage,
        };
        use async_trait::async_trait;

        struct EchoCompletion;
        #[async_trait]
        impl CompletionClient for EchoCompletion {
            async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError> {
                let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
                Ok(Completion {
                    content: format!("echo: {last}"),
                    usage: None,
                })
            }
        }

        Self::fake_with(Arc::new(EchoCompletion))
    }

    #[cfg(test)]
    pub fn fake_with(chat: Arc<dyn CompletionClient>) -> Self {
        use crate::config::{ChatConfig, PasswordScheme, SessionConfig};

        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: "front".into(),
            password_scheme: PasswordScheme::Sha256,
            session: SessionConfig { max_age_secs: 3600 },
            chat: ChatConfig {
                api_url: "http://fake.local/completions".into(),
                timeout_secs: 30,
                system_prompt: None,
            },
        };
        Self::from_parts(config, chat)
    }
}
