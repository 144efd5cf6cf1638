//! OpenAI chat-completions backend, also used for OpenAI-compatible providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::chat::{ChatMessage, Role};
use crate::error::{AiError, Result};
use crate::settings::{Provider, ProviderSettings};
use crate::sse::{StreamFormat, TokenStream, token_stream};

use super::{Backend, check_status, endpoint};

/// Backend for `openai` and `iotteam`.
pub struct OpenAiBackend {
    client: Client,
    provider: Provider,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a backend posting to `<base_url>/chat/completions`.
    pub fn new(client: Client, provider: Provider, base_url: &str, config: &ProviderSettings) -> Self {
        Self {
            client,
            provider,
            url: endpoint(base_url, "chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response> {
        debug!("POST {} (model {}, stream {})", self.url, self.model, body.stream);
        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        check_status(self.provider, response).await
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

fn api_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "assistant",
    }
}

fn chat_messages(system: &str, history: &[ChatMessage]) -> Vec<ApiMessage> {
    std::iter::once(ApiMessage {
        role: "system",
        content: system.to_string(),
    })
    .chain(history.iter().map(|m| ApiMessage {
        role: api_role(m.role),
        content: m.text(),
    }))
    .collect()
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            response_format: Some(json!({ "type": "json_object" })),
            stream: false,
        };
        let body: Value = self.post(&request).await?.json().await?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AiError::malformed("missing choices[0].message.content"))
    }

    async fn stream_chat(&self, system: &str, history: &[ChatMessage]) -> Result<TokenStream> {
        let request = ChatRequest {
            model: &self.model,
            messages: chat_messages(system, history),
            response_format: None,
            stream: true,
        };
        let response = self.post(&request).await?;
        Ok(token_stream(response, StreamFormat::OpenAi))
    }
}
