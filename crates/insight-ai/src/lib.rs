//! AI gateway for Factory Insight.
//!
//! This crate turns device data into requests for hosted language models:
//!
//! - [`settings`]: active provider plus per-provider key, model and base URL,
//!   persisted as JSON
//! - [`prompt`]: the analysis prompt and the chat system instruction
//! - [`backends`]: Gemini, OpenAI-compatible and Anthropic request shapes
//! - [`sse`]: decoding of streamed responses into text tokens
//! - [`analysis`]: predictive maintenance reports
//! - [`chat`]: multi-turn chat grounded in device history
//!
//! # Example
//!
//! ```no_run
//! use insight_ai::{SettingsStore, http_client, predictive_analysis};
//! use insight_types::{Device, DeviceSpec, Reading};
//!
//! # async fn example() -> insight_ai::Result<()> {
//! let settings = SettingsStore::load_default().effective();
//! let device = Device::new(
//!     DeviceSpec::new("pmp-003", "Coolant Pump Gamma", "Modbus RTU"),
//!     Reading::now(78.0, 182.0, 3.6),
//! );
//! if let Some(report) = predictive_analysis(&settings, http_client()?, &device).await {
//!     println!("{}: {}", report.risk_level, report.prediction);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod backends;
pub mod chat;
pub mod error;
pub mod prompt;
pub mod settings;
pub mod sse;

pub use analysis::{Analysis, RiskLevel, analyze_device, parse_analysis, predictive_analysis};
pub use backends::{AnthropicBackend, Backend, GeminiBackend, OpenAiBackend, backend_for, http_client};
pub use chat::{CHAT_ERROR_MESSAGE, ChatMessage, ChatSession, Part, Role};
pub use error::{AiError, Result};
pub use prompt::{analysis_prompt, system_instruction};
pub use settings::{AiSettings, GEMINI_API_KEY_ENV, Provider, ProviderSettings, SettingsStore};
pub use sse::{SseData, SseDecoder, StreamFormat, TokenStream, token_stream};
