use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{assistant_reply, build_http, read_success_body, CompletionOptions, CompletionService};
use crate::error::CompletionError;
use crate::state::ChatMessage;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    options: CompletionOptions,
}

impl OpenAIClient {
    pub fn new(api_key: &str, options: CompletionOptions) -> Result<Self, CompletionError> {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL, options)
    }

    /// Point the client at an OpenAI-compatible endpoint, e.g. a trusted proxy
    pub fn with_base_url(api_key: &str, base_url: &str, options: CompletionOptions) -> Result<Self, CompletionError> {
        Ok(Self {
            client: build_http(&options)?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
        })
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4".to_string(),
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }

    fn build_request<'a>(&self, model: &'a str, messages: &'a [ChatMessage]) -> OpenAIRequest<'a> {
        OpenAIRequest {
            model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        }
    }
}

fn parse_response(body: &str) -> Result<ChatMessage, CompletionError> {
    let response: OpenAIResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Parse("response has no choices".to_string()))?;
    assistant_reply(choice.message.content)
}

#[async_trait]
impl CompletionService for OpenAIClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        let request = self.build_request(model, messages);

        let response = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    fn client() -> OpenAIClient {
        OpenAIClient::with_base_url("sk-test", "https://proxy.example/v1/", CompletionOptions::default()).unwrap()
    }

    #[test]
    fn test_request_keeps_roles_and_order() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("frage"),
            ChatMessage::assistant("antwort"),
        ];
        let client = client();
        let json = serde_json::to_value(client.build_request("gpt-4", &messages)).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["max_tokens"], 1000);
        let roles: Vec<&str> = json["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "https://proxy.example/v1");
    }

    #[test]
    fn test_parse_text_response() {
        let body = serde_json::json!({
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "1. Technikjournalist..." },
                "finish_reason": "stop"
            }]
        })
        .to_string();
        let msg = parse_response(&body).unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.content, "1. Technikjournalist...");
    }

    #[test]
    fn test_parse_missing_choices() {
        let body = serde_json::json!({ "model": "gpt-4", "choices": [] }).to_string();
        assert!(matches!(parse_response(&body), Err(CompletionError::Parse(_))));
    }

    #[test]
    fn test_parse_null_content_is_empty_reply() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })
        .to_string();
        assert!(matches!(parse_response(&body), Err(CompletionError::EmptyReply)));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>"), Err(CompletionError::Parse(_))));
    }
}
