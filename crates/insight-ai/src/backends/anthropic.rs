//! Anthropic messages backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::chat::{ChatMessage, Role};
use crate::error::{AiError, Result};
use crate::settings::{Provider, ProviderSettings};
use crate::sse::{StreamFormat, TokenStream, token_stream};

use super::{Backend, check_status, endpoint};

/// Default API root.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
/// Value of the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const ANALYSIS_MAX_TOKENS: u32 = 1024;
const CHAT_MAX_TOKENS: u32 = 2048;

pub struct AnthropicBackend {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a backend; a configured base URL replaces the public API root.
    pub fn new(client: Client, config: &ProviderSettings) -> Self {
        let base_url = config.base_url.as_deref().unwrap_or(ANTHROPIC_BASE_URL);
        Self {
            client,
            url: endpoint(base_url, "messages"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn post(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        debug!("POST {} (model {}, stream {})", self.url, self.model, body.stream);
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;
        check_status(Provider::Anthropic, response).await
    }
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

fn messages(history: &[ChatMessage]) -> Vec<ApiMessage> {
    history
        .iter()
        .map(|m| ApiMessage {
            role: match m.role {
                Role::User => "user",
                Role::Model => "assistant",
            },
            content: m.text(),
        })
        .collect()
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: ANALYSIS_MAX_TOKENS,
            system: None,
            messages: messages(&[ChatMessage::user(prompt)]),
            stream: false,
        };
        let body: Value = self.post(&request).await?.json().await?;
        body.pointer("/content/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AiError::malformed("missing content[0].text"))
    }

    async fn stream_chat(&self, system: &str, history: &[ChatMessage]) -> Result<TokenStream> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: CHAT_MAX_TOKENS,
            system: Some(system),
            messages: messages(history),
            stream: true,
        };
        let response = self.post(&request).await?;
        Ok(token_stream(response, StreamFormat::Anthropic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let history = [ChatMessage::user("a"), ChatMessage::model("b")];
        let request = MessagesRequest {
            model: "claude-3-5-sonnet-20240620",
            max_tokens: CHAT_MAX_TOKENS,
            system: Some("sys"),
            messages: messages(&history),
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_default_url() {
        let config = ProviderSettings {
            api_key: "k".into(),
            model: "m".into(),
            base_url: None,
        };
        let backend = AnthropicBackend::new(Client::new(), &config);
        assert_eq!(backend.url, "https://api.anthropic.com/v1/messages");
    }
}
