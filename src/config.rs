//! Configuration for the PeopleDesk portal
//!
//! Everything is loaded from the environment (with `.env` support for local
//! development). The LLM API key is optional at load time: agents that need
//! it fail construction individually instead of preventing service startup.

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// OpenRouter-backed LLM client configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// API key, absent when `OPENROUTER_API_KEY` is not set
    pub api_key: Option<SecretString>,
    /// Base URL for the OpenRouter API
    pub base_url: Url,
    /// Default model for agents
    pub default_model: String,
    /// Request timeout
    pub timeout: Duration,
    /// App name for OpenRouter tracking
    pub app_name: String,
}

impl LlmConfig {
    /// Create a new LLM configuration from environment variables
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        Self {
            api_key,
            base_url: Url::parse("https://openrouter.ai/api/v1").expect("valid OpenRouter URL"),
            default_model: std::env::var("PEOPLEDESK_MODEL")
                .unwrap_or_else(|_| presets::BALANCED.to_string()),
            timeout: Duration::from_secs(120),
            app_name: "PeopleDesk HR Portal".to_string(),
        }
    }

    /// Create a configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(api_key.into())),
            base_url: Url::parse("https://openrouter.ai/api/v1").expect("valid OpenRouter URL"),
            default_model: presets::BALANCED.to_string(),
            timeout: Duration::from_secs(120),
            app_name: "PeopleDesk HR Portal".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the default model
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the API key, or a configuration error when it is not set
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or_else(|| Error::config("OPENROUTER_API_KEY environment variable not set"))
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "***REDACTED***"),
            )
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// LLM client configuration
    pub llm: LlmConfig,
    /// SQLite database URL
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Directory where uploaded CV files are stored
    pub upload_dir: PathBuf,
    /// Sender address recorded on drafted emails
    pub mail_sender: String,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up OPENROUTER_API_KEY
        let _ = dotenv();

        let bind_addr = std::env::var("PEOPLEDESK_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::config(format!("invalid PEOPLEDESK_ADDR: {e}")))?;

        Ok(Self {
            llm: LlmConfig::from_env(),
            database_url: std::env::var("PEOPLEDESK_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://peopledesk.db?mode=rwc".to_string()),
            bind_addr,
            upload_dir: std::env::var("PEOPLEDESK_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads/cvs")),
            mail_sender: std::env::var("PEOPLEDESK_MAIL_SENDER")
                .unwrap_or_else(|_| "hr@peopledesk.local".to_string()),
        })
    }

    /// Set the database URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Set the bind address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

/// Recommended model configurations
pub mod presets {
    /// Recommended for complex reasoning tasks (candidate evaluation)
    pub const REASONING: &str = "anthropic/claude-sonnet-4";

    /// Balanced performance and cost
    pub const BALANCED: &str = "anthropic/claude-sonnet-4";

    /// Fast responses, lower cost (email drafting)
    pub const FAST: &str = "anthropic/claude-haiku-4";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_absent_is_config_error() {
        let config = LlmConfig {
            api_key: None,
            base_url: Url::parse("https://openrouter.ai/api/v1").unwrap(),
            default_model: presets::BALANCED.to_string(),
            timeout: Duration::from_secs(5),
            app_name: "test".to_string(),
        };
        assert!(matches!(config.api_key(), Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = LlmConfig::new("secret-key-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key-value"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_builder_methods() {
        let config = LlmConfig::new("k")
            .with_default_model("anthropic/claude-haiku-4")
            .with_timeout(Duration::from_secs(10));
        assert_eq!(config.default_model, "anthropic/claude-haiku-4");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
