//! Chat sessions grounded in live device data.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error};

use insight_types::Device;

use crate::backends::Backend;
use crate::prompt::system_instruction;

/// Reply shown in place of the model's answer when a turn fails.
pub const CHAT_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error. Please check the AI provider settings.";

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One text part of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// A chat message in the Gemini `{role, parts}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ChatMessage {
    /// A single-part message.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// A user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// A model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// All parts concatenated.
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }

    fn set_text(&mut self, text: impl Into<String>) {
        self.parts = vec![Part { text: text.into() }];
    }

    fn push_text(&mut self, token: &str) {
        match self.parts.last_mut() {
            Some(part) => part.text.push_str(token),
            None => self.parts.push(Part {
                text: token.to_string(),
            }),
        }
    }
}

/// A running conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Start an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a conversation.
    pub fn with_history(history: Vec<ChatMessage>) -> Self {
        Self { history }
    }

    /// Messages so far, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Forget the conversation.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send a message and collect the streamed reply.
    ///
    /// See [`send_with`](Self::send_with).
    pub async fn send(
        &mut self,
        message: &str,
        backend: &dyn Backend,
        devices: &[Device],
    ) -> Option<&ChatMessage> {
        self.send_with(message, backend, devices, |_| {}).await
    }

    /// Send a message, calling `on_token` for every streamed token.
    ///
    /// Blank input is ignored and returns `None`. Otherwise the user message
    /// and an empty model placeholder are appended and the placeholder fills
    /// up as tokens arrive. Any failure replaces the placeholder with
    /// [`CHAT_ERROR_MESSAGE`]; the session stays usable.
    pub async fn send_with<F>(
        &mut self,
        message: &str,
        backend: &dyn Backend,
        devices: &[Device],
        mut on_token: F,
    ) -> Option<&ChatMessage>
    where
        F: FnMut(&str) + Send,
    {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        self.history.push(ChatMessage::user(message));
        let system = system_instruction(devices, OffsetDateTime::now_utc());
        let request = self.history.clone();
        self.history.push(ChatMessage::model(""));
        let reply = self.history.len() - 1;

        let result = match backend.stream_chat(&system, &request).await {
            Ok(mut stream) => {
                let mut outcome = Ok(());
                while let Some(token) = stream.next().await {
                    match token {
                        Ok(token) => {
                            on_token(&token);
                            self.history[reply].push_text(&token);
                        }
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                outcome
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => debug!(
                "{} chat reply finished ({} chars)",
                backend.provider(),
                self.history[reply].text().len()
            ),
            Err(e) => {
                error!("Error in chat with {}: {}", backend.provider(), e);
                self.history[reply].set_text(CHAT_ERROR_MESSAGE);
            }
        }
        self.history.get(reply)
    }
}
