//! OpenAI- and Anthropic-compatible HTTP provider (§6 `provider: openai|anthropic`).
//!
//! Request/response shapes follow the teacher's
//! `reasoning::providers::cloud::CloudInferenceProvider`, narrowed to plain
//! text and JSON-object responses — no tool-call or streaming support,
//! since expert tool-calling is the inner loop's own concern (§1).

use super::{InferenceError, InferenceOptions, InferenceProvider, InferenceResponse, ResponseFormat};
use crate::conversation::{Message, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudVendor {
    OpenAi,
    Anthropic,
}

pub struct CloudInferenceProvider {
    vendor: CloudVendor,
    api_key: String,
    base_url: String,
    client: Client,
}

impl CloudInferenceProvider {
    pub fn new(vendor: CloudVendor, api_key: impl Into<String>) -> Self {
        let base_url = match vendor {
            CloudVendor::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            CloudVendor::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
        };
        Self {
            vendor,
            api_key: api_key.into(),
            base_url,
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_openai_body(&self, messages: &[Message], options: &InferenceOptions) -> serde_json::Value {
        let mut body = json!({
            "model": options.model,
            "messages": messages.iter().map(openai_message).collect::<Vec<_>>(),
            "temperature": options.temperature,
        });
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if options.response_format == ResponseFormat::JsonObject {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    fn build_anthropic_body(&self, messages: &[Message], options: &InferenceOptions) -> serde_json::Value {
        let system: Option<String> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone())
            .reduce(|a, b| format!("{a}\n{b}"));

        let turns: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                json!({
                    "role": if m.role == MessageRole::Assistant { "assistant" } else { "user" },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": options.model,
            "messages": turns,
            "max_tokens": options.max_tokens.unwrap_or(4096),
        });
        if options.temperature > 0.0 {
            body["temperature"] = json!(options.temperature);
        }
        if let Some(sys) = system {
            body["system"] = json!(sys);
        }
        body
    }

    fn parse_openai_response(resp: &serde_json::Value) -> Result<InferenceResponse, InferenceError> {
        let content = resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| InferenceError::Provider("no message content in response".into()))?;
        Ok(InferenceResponse {
            content: content.to_string(),
        })
    }

    fn parse_anthropic_response(resp: &serde_json::Value) -> Result<InferenceResponse, InferenceError> {
        let blocks = resp
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| InferenceError::Provider("no content blocks in response".into()))?;
        let mut text = String::new();
        for block in blocks {
            if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
            }
        }
        Ok(InferenceResponse { content: text })
    }
}

fn openai_message(message: &Message) -> serde_json::Value {
    let role = match message.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    json!({ "role": role, "content": message.content })
}

#[async_trait]
impl InferenceProvider for CloudInferenceProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError> {
        let mut request = self.client.post(&self.base_url);
        let body = match self.vendor {
            CloudVendor::OpenAi => {
                request = request.bearer_auth(&self.api_key);
                self.build_openai_body(messages, options)
            }
            CloudVendor::Anthropic => {
                request = request
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01");
                self.build_anthropic_body(messages, options)
            }
        };

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(InferenceError::RateLimited(
                response.text().await.unwrap_or_default(),
            ));
        }
        if !status.is_success() {
            return Err(InferenceError::Provider(format!(
                "{status}: {}",
                response.text().await.unwrap_or_default()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Provider(format!("malformed response body: {e}")))?;

        match self.vendor {
            CloudVendor::OpenAi => Self::parse_openai_response(&body),
            CloudVendor::Anthropic => Self::parse_anthropic_response(&body),
        }
    }
}
