//! Google Gemini backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::chat::{ChatMessage, Part};
use crate::error::{AiError, Result};
use crate::prompt::analysis_schema;
use crate::settings::{Provider, ProviderSettings};
use crate::sse::{StreamFormat, TokenStream, token_stream};

use super::{Backend, check_status, endpoint};

/// Default API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: [Part; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Value>,
}

impl GeminiBackend {
    /// Create a backend; a configured base URL replaces the public API root.
    pub fn new(client: Client, config: &ProviderSettings) -> Self {
        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        endpoint(&self.base_url, &format!("models/{}:{}", self.model, method))
    }

    async fn post(&self, url: &str, body: &GenerateRequest<'_>) -> Result<reqwest::Response> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        check_status(Provider::Gemini, response).await
    }
}

fn system_instruction(text: &str) -> SystemInstruction {
    SystemInstruction {
        parts: [Part {
            text: text.to_string(),
        }],
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn analyze(&self, prompt: &str) -> Result<String> {
        let contents = [ChatMessage::user(prompt)];
        let request = GenerateRequest {
            contents: &contents,
            system_instruction: None,
            generation_config: Some(json!({
                "responseMimeType": "application/json",
                "responseSchema": analysis_schema(),
            })),
        };
        let body: Value = self
            .post(&self.url("generateContent"), &request)
            .await?
            .json()
            .await?;
        body.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AiError::malformed("missing candidates[0].content.parts[0].text"))
    }

    async fn stream_chat(&self, system: &str, history: &[ChatMessage]) -> Result<TokenStream> {
        let request = GenerateRequest {
            contents: history,
            system_instruction: Some(system_instruction(system)),
            generation_config: None,
        };
        let url = format!("{}?alt=sse", self.url("streamGenerateContent"));
        let response = self.post(&url, &request).await?;
        Ok(token_stream(response, StreamFormat::Gemini))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        let config = ProviderSettings {
            api_key: "k".into(),
            model: "gemini-2.5-flash".into(),
            base_url: None,
        };
        GeminiBackend::new(Client::new(), &config)
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            backend().url("generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let history = [ChatMessage::user("hi")];
        let request = GenerateRequest {
            contents: &history,
            system_instruction: Some(system_instruction("sys")),
            generation_config: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json.get("generationConfig").is_none());
    }
}
