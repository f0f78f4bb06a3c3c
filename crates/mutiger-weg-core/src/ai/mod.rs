//! Completion service seam and the provider clients behind it.

pub mod claude;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::CompletionError;
use crate::provider::Provider;
use crate::state::ChatMessage;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Sends an ordered list of role-tagged messages, returns one assistant message.
///
/// Implemented by every provider client and by test doubles.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`CompletionError`] on transport failure, non-success status,
    /// a malformed body, or a reply without text.
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError>;
}

/// Sampling and transport settings shared by all providers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

fn build_http(options: &CompletionOptions) -> Result<Client, CompletionError> {
    Client::builder()
        .timeout(options.request_timeout)
        .connect_timeout(options.connect_timeout)
        .build()
        .map_err(|e| CompletionError::HttpClientBuild(e.to_string()))
}

/// Turn provider text into an assistant message; blank text is an error.
fn assistant_reply(content: Option<String>) -> Result<ChatMessage, CompletionError> {
    match content {
        Some(text) if !text.trim().is_empty() => Ok(ChatMessage::assistant(text)),
        _ => Err(CompletionError::EmptyReply),
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, CompletionError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(CompletionError::Status { status: status.as_u16(), body: text });
    }
    Ok(text)
}

/// Concrete client dispatching to the configured provider
#[derive(Clone)]
pub enum CompletionClient {
    OpenAI(OpenAIClient),
    Claude(ClaudeClient),
    Ollama(OllamaClient),
}

impl CompletionClient {
    /// Build a client for `provider` using keys and endpoints from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a hosted provider has no API key or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config, provider: Provider) -> Result<Self, CompletionError> {
        let options = config.completion_options();
        let missing_key = || CompletionError::MissingApiKey { provider: provider.display_name().to_string() };

        let client = match provider {
            Provider::OpenAI => {
                let key = config.api_key(provider).ok_or_else(missing_key)?;
                CompletionClient::OpenAI(OpenAIClient::with_base_url(&key, &config.openai_base_url(), options)?)
            }
            Provider::Claude => {
                let key = config.api_key(provider).ok_or_else(missing_key)?;
                CompletionClient::Claude(ClaudeClient::new(&key, options)?)
            }
            Provider::Ollama => CompletionClient::Ollama(OllamaClient::new(&config.ollama_url(), options)?),
        };
        Ok(client)
    }

    pub fn provider(&self) -> Provider {
        match self {
            CompletionClient::OpenAI(_) => Provider::OpenAI,
            CompletionClient::Claude(_) => Provider::Claude,
            CompletionClient::Ollama(_) => Provider::Ollama,
        }
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        match self {
            CompletionClient::OpenAI(c) => c.complete(model, messages).await,
            CompletionClient::Claude(c) => c.complete(model, messages).await,
            CompletionClient::Ollama(c) => c.complete(model, messages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_reply_is_empty_error() {
        assert!(matches!(assistant_reply(None), Err(CompletionError::EmptyReply)));
        assert!(matches!(
            assistant_reply(Some("  \n".to_string())),
            Err(CompletionError::EmptyReply)
        ));
        let msg = assistant_reply(Some("1. Technikjournalist".to_string())).unwrap();
        assert_eq!(msg, ChatMessage::assistant("1. Technikjournalist"));
    }

    #[test]
    fn test_hosted_provider_without_key_fails() {
        let config = Config::new();
        let result = CompletionClient::from_config(&config, Provider::Claude);
        // ANTHROPIC_API_KEY may be set on a developer machine
        if std::env::var(Provider::Claude.api_key_env().unwrap_or_default()).is_err() {
            assert!(matches!(result, Err(CompletionError::MissingApiKey { .. })));
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let client = CompletionClient::from_config(&Config::new(), Provider::Ollama).unwrap();
        assert_eq!(client.provider(), Provider::Ollama);
    }
}
