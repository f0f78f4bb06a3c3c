use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{assistant_reply, build_http, read_success_body, CompletionOptions, CompletionService};
use crate::error::CompletionError;
use crate::state::ChatMessage;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    options: CompletionOptions,
}

impl OllamaClient {
    pub fn new(base_url: &str, options: CompletionOptions) -> Result<Self, CompletionError> {
        Ok(Self {
            client: build_http(&options)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
        })
    }

    pub async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body = read_success_body(response).await?;

        let models_response: OllamaModelsResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Parse(e.to_string()))?;
        Ok(models_response.models.into_iter().map(|model| model.name).collect())
    }

    fn build_request<'a>(&self, model: &'a str, messages: &'a [ChatMessage]) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| OllamaMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            stream: false,
            options: OllamaOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        }
    }
}

fn parse_response(body: &str) -> Result<ChatMessage, CompletionError> {
    let response: OllamaChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;
    assistant_reply(response.message.and_then(|m| m.content))
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.build_request(model, messages);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CompletionError::Request(format!("{e}. Make sure Ollama is running with: ollama serve"))
            })?;

        let body = read_success_body(response).await?;
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_disables_streaming() {
        let client = OllamaClient::new(DEFAULT_OLLAMA_URL, CompletionOptions::default()).unwrap();
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("frage")];
        let json = serde_json::to_value(client.build_request("llama3.2:latest", &messages)).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 1000);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_parse_chat_response() {
        let body = serde_json::json!({
            "model": "llama3.2:latest",
            "message": { "role": "assistant", "content": "🎨 Mediengestalter/in" },
            "done": true
        })
        .to_string();
        assert_eq!(parse_response(&body).unwrap().content, "🎨 Mediengestalter/in");
    }

    #[test]
    fn test_parse_without_message() {
        let body = serde_json::json!({ "done": true }).to_string();
        assert!(matches!(parse_response(&body), Err(CompletionError::EmptyReply)));
    }
}
