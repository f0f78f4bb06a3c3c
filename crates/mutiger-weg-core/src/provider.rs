use std::fmt;
use std::str::FromStr;

use crate::ai::{ClaudeClient, OpenAIClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAI,
    Claude,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Claude => "claude",
            Provider::Ollama => "ollama",
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::OpenAI, Provider::Claude, Provider::Ollama]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::Ollama => "Ollama (Local)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4",
            Provider::Claude => "claude-sonnet-4-20250514",
            Provider::Ollama => "llama3.2:latest",
        }
    }

    /// Environment variable holding the API key; `None` for local providers
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Claude => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
        }
    }

    /// Known models for hosted providers. Ollama models are listed at runtime.
    pub fn known_models(&self) -> Vec<String> {
        match self {
            Provider::OpenAI => OpenAIClient::list_models(),
            Provider::Claude => ClaudeClient::list_models(),
            Provider::Ollama => Vec::new(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(Provider::OpenAI),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "ollama" => Ok(Provider::Ollama),
            other => Err(format!("unknown provider '{other}' (expected openai, claude or ollama)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<Provider>(), Ok(Provider::OpenAI));
        assert_eq!(" anthropic ".parse::<Provider>(), Ok(Provider::Claude));
        assert!("gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn test_round_trip_through_as_str() {
        for provider in Provider::all() {
            assert_eq!(provider.as_str().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn test_default_is_openai_gpt4() {
        assert_eq!(Provider::default().default_model(), "gpt-4");
    }
}
