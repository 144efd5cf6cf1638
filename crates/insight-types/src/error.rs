//! Error types for data validation in insight-types.

use thiserror::Error;

/// Errors that can occur when building or parsing Factory Insight records.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("Field '{0}' cannot be empty")]
    EmptyField(&'static str),

    /// A status label did not match any known status.
    #[error("Unknown device status: {0}")]
    UnknownStatus(String),

    /// A connection state label did not match any known state.
    #[error("Unknown connection status: {0}")]
    UnknownConnectionStatus(String),

    /// A channel name did not match any known channel.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// An AI provider name did not match any supported provider.
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
}

/// Result type alias using insight-types' [`ValidationError`].
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
