//! Provider backends.
//!
//! Each backend turns the two gateway capabilities, one-shot JSON analysis
//! and streamed chat, into its provider's request shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::chat::ChatMessage;
use crate::error::{AiError, Result};
use crate::settings::{AiSettings, Provider};
use crate::sse::TokenStream;

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// Capabilities every provider offers.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Provider served by this backend.
    fn provider(&self) -> Provider;

    /// Send an analysis prompt and return the raw JSON text of the answer.
    async fn analyze(&self, prompt: &str) -> Result<String>;

    /// Stream a reply to `history`, whose last message is the user's turn.
    async fn stream_chat(&self, system: &str, history: &[ChatMessage]) -> Result<TokenStream>;
}

/// HTTP client shared by all backends.
///
/// Only the connect phase is bounded; chat streams may run long.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Build the backend for the active provider.
///
/// Fails when the provider has no API key, or is OpenAI-compatible and has no
/// base URL.
pub fn backend_for(settings: &AiSettings, client: Client) -> Result<Box<dyn Backend>> {
    let provider = settings.provider;
    let config = settings.active();
    if !config.has_api_key() {
        return Err(AiError::MissingApiKey(provider));
    }

    let backend: Box<dyn Backend> = match provider {
        Provider::Gemini => Box::new(GeminiBackend::new(client, config)),
        Provider::Anthropic => Box::new(AnthropicBackend::new(client, config)),
        Provider::OpenAi | Provider::IotTeam => {
            let base_url = config
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .ok_or(AiError::MissingBaseUrl(provider))?;
            Box::new(OpenAiBackend::new(client, provider, base_url, config))
        }
    };
    Ok(backend)
}

/// Pass a successful response through, otherwise turn it into [`AiError::Api`].
pub(crate) async fn check_status(provider: Provider, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AiError::Api {
        provider,
        status: status.as_u16(),
        body,
    })
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    enum Script {
        Tokens(Vec<String>),
        Fail,
        BreakAfter(Vec<String>),
    }

    /// In-memory backend with a fixed reply.
    pub struct ScriptedBackend {
        script: Script,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedBackend {
        fn with(script: Script) -> Self {
            Self {
                script,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn tokens(tokens: &[&str]) -> Self {
            Self::with(Script::Tokens(tokens.iter().map(|t| t.to_string()).collect()))
        }

        pub fn failing() -> Self {
            Self::with(Script::Fail)
        }

        pub fn broken_after(tokens: &[&str]) -> Self {
            Self::with(Script::BreakAfter(
                tokens.iter().map(|t| t.to_string()).collect(),
            ))
        }

        pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn analyze(&self, _prompt: &str) -> Result<String> {
            match &self.script {
                Script::Tokens(tokens) => Ok(tokens.concat()),
                _ => Err(AiError::malformed("scripted failure")),
            }
        }

        async fn stream_chat(&self, _system: &str, history: &[ChatMessage]) -> Result<TokenStream> {
            self.requests.lock().unwrap().push(history.to_vec());
            let items: Vec<Result<String>> = match &self.script {
                Script::Tokens(tokens) => tokens.iter().cloned().map(Ok).collect(),
                Script::Fail => return Err(AiError::MissingApiKey(Provider::Gemini)),
                Script::BreakAfter(tokens) => tokens
                    .iter()
                    .cloned()
                    .map(Ok)
                    .chain(std::iter::once(Err(AiError::malformed("stream cut"))))
                    .collect(),
            };
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }
}
