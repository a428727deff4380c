use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;

pub const DEFAULT_CHAT_API_URL: &str = "https://dev.wenivops.co.kr/services/openai-api";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are MovieBot, a helpful assistant that summarizes movies and recommends similar films.";

/// How new passwords are hashed. Verification accepts either format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Argon2,
    /// Unsalted SHA-256 hex digest. Only for compatibility with existing digests.
    Sha256,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" => Ok(Self::Argon2),
            "sha256" => Ok(Self::Sha256),
            other => anyhow::bail!("unknown password hash scheme {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub system_prompt: Option<String>,
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_age_secs: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub password_scheme: PasswordScheme,
    pub session: SessionConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let password_scheme = match std::env::var("PASSWORD_HASH") {
            Ok(v) => v.parse().context("PASSWORD_HASH")?,
            Err(_) => PasswordScheme::Argon2,
        };

        // An explicitly empty prompt turns injection off.
        let system_prompt = match std::env::var("CHAT_SYSTEM_PROMPT") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(v),
            Err(_) => Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080),
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "front".into())
                .into(),
            password_scheme,
            session: SessionConfig {
                max_age_secs: env_parse("SESSION_MAX_AGE_SECS", 3600),
            },
            chat: ChatConfig {
                api_url: std::env::var("CHAT_API_URL")
                    .unwrap_or_else(|_| DEFAULT_CHAT_API_URL.into()),
                timeout_secs: env_parse("CHAT_API_TIMEOUT_SECS", 30),
                system_prompt,
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
