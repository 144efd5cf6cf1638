//! Error types for the AI gateway.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::Provider;

/// Errors that can occur while talking to an AI provider.
///
/// None of these are retried. Predictive analysis turns them into an absent
/// result, chat turns them into an apology message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiError {
    /// The active provider has no API key configured.
    #[error("{0} API key is not set.")]
    MissingApiKey(Provider),

    /// An OpenAI-compatible provider has no base URL configured.
    #[error("{0} Base URL is not set in settings.")]
    MissingBaseUrl(Provider),

    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Failed to fetch from {provider}. Status: {status}")]
    Api {
        /// Provider that answered.
        provider: Provider,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Settings could not be read or written.
    #[error("Settings error at {path}: {message}")]
    Settings {
        /// Settings file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl AiError {
    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Create a settings error.
    pub fn settings(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Settings {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias using [`AiError`].
pub type Result<T> = std::result::Result<T, AiError>;
