use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::ollama::DEFAULT_OLLAMA_URL;
use crate::ai::openai::DEFAULT_OPENAI_BASE_URL;
use crate::ai::{
    CompletionOptions, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_TOKENS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TEMPERATURE,
};
use crate::controller::FailedTurnPolicy;
use crate::provider::Provider;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub rollback_failed_follow_up: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::OpenAI.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("mutiger-weg").join("config.json"))
    }

    /// Configured provider; unknown names fall back to OpenAI
    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    pub fn model_for(&self, provider: Provider) -> String {
        self.default_model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// API key for a hosted provider: environment variable first, then config
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let from_env = provider.api_key_env().and_then(|var| std::env::var(var).ok());
        let stored = match provider {
            Provider::OpenAI => self.openai_api_key.as_ref(),
            Provider::Claude => self.claude_api_key.as_ref(),
            Provider::Ollama => None,
        };
        resolve_api_key(from_env, stored)
    }

    pub fn openai_base_url(&self) -> String {
        self.openai_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
    }

    pub fn ollama_url(&self) -> String {
        self.ollama_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                self.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        }
    }

    pub fn failed_turn_policy(&self) -> FailedTurnPolicy {
        if self.rollback_failed_follow_up {
            FailedTurnPolicy::RollBack
        } else {
            FailedTurnPolicy::KeepUserMessage
        }
    }
}

fn resolve_api_key(from_env: Option<String>, stored: Option<&String>) -> Option<String> {
    let usable = |key: &String| !key.trim().is_empty();
    from_env
        .filter(usable)
        .or_else(|| stored.filter(|key| usable(key)).cloned())
}
