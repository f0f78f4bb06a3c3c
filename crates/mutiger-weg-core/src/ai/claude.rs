use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{assistant_reply, build_http, read_success_body, CompletionOptions, CompletionService};
use crate::error::CompletionError;
use crate::state::{ChatMessage, ChatRole};

const CLAUDE_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    options: CompletionOptions,
}

impl ClaudeClient {
    pub fn new(api_key: &str, options: CompletionOptions) -> Result<Self, CompletionError> {
        Ok(Self {
            client: build_http(&options)?,
            api_key: api_key.to_string(),
            options,
        })
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }

    /// The messages API takes the system prompt as a top-level field
    fn build_request<'a>(&self, model: &'a str, messages: &'a [ChatMessage]) -> ClaudeRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        ClaudeRequest {
            model,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            system: if system.is_empty() { None } else { Some(system.join("\n\n")) },
            messages: messages
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .map(|m| ClaudeMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
        }
    }
}

fn parse_response(body: &str) -> Result<ChatMessage, CompletionError> {
    let response: ClaudeResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;
    let text: String = response
        .content
        .into_iter()
        .filter(|c| c.kind == "text")
        .filter_map(|c| c.text)
        .collect();
    assistant_reply(Some(text))
}

#[async_trait]
impl CompletionService for ClaudeClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        let request = self.build_request(model, messages);

        let response = self.client
            .post(CLAUDE_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_response(&body)
    }
}
