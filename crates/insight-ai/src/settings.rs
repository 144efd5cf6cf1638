//! AI provider settings and their persistence.
//!
//! Settings are stored as JSON. Loading merges whatever was saved on top of
//! the defaults, provider by provider and field by field, so a partial or
//! older file never loses a default model or base URL. An unreadable file is
//! logged and replaced by the defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use insight_types::ValidationError;

use crate::error::{AiError, Result};

/// Environment variable that overrides the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Supported AI providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini.
    #[default]
    Gemini,
    /// OpenAI chat completions.
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// IoT Team, an OpenAI-compatible endpoint.
    #[serde(rename = "iotteam")]
    IotTeam,
}

impl Provider {
    /// All providers in display order.
    pub const ALL: [Provider; 4] = [
        Provider::Gemini,
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::IotTeam,
    ];

    /// Whether the provider speaks the OpenAI chat-completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::IotTeam)
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::IotTeam => "IoT Team",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::IotTeam => write!(f, "iotteam"),
        }
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "iotteam" => Ok(Provider::IotTeam),
            _ => Err(ValidationError::UnknownProvider(s.to_string())),
        }
    }
}

/// Credentials and model for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    /// API key; empty when unset.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Endpoint root, required for OpenAI-compatible providers.
    #[serde(
        rename = "baseURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    fn new(model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: String::new(),
            model: model.to_string(),
            base_url: base_url.map(str::to_string),
        }
    }

    /// Whether an API key is present.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// The active provider plus settings for every provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    /// Provider used for analysis and chat.
    pub provider: Provider,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub iotteam: ProviderSettings,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            gemini: ProviderSettings::new("gemini-2.5-flash", None),
            openai: ProviderSettings::new("gpt-4o", Some("https://api.openai.com/v1")),
            anthropic: ProviderSettings::new("claude-3-5-sonnet-20240620", None),
            iotteam: ProviderSettings::new("iot-model-v1", Some("https://api.iotteam.com/v1")),
        }
    }
}

const MASK: &str = "****";

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if key.chars().count() > 8 {
        format!("{MASK}{tail}")
    } else {
        MASK.to_string()
    }
}

impl AiSettings {
    /// Settings of one provider.
    pub fn get(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::IotTeam => &self.iotteam,
        }
    }

    /// Mutable settings of one provider.
    pub fn get_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::OpenAi => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::IotTeam => &mut self.iotteam,
        }
    }

    /// Settings of the active provider.
    pub fn active(&self) -> &ProviderSettings {
        self.get(self.provider)
    }

    /// Replace the Gemini key with the environment override, if set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.gemini.api_key = key;
        }
        self
    }

    /// Copy with every API key reduced to a mask (last four characters kept
    /// for long keys).
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        for provider in Provider::ALL {
            let settings = masked.get_mut(provider);
            settings.api_key = mask_key(&settings.api_key);
        }
        masked
    }

    /// Apply settings submitted by a client that was shown [`masked`](Self::masked).
    ///
    /// A key left exactly as its mask keeps the stored key.
    pub fn apply_update(&mut self, incoming: AiSettings) {
        let previous = self.clone();
        *self = incoming;
        for provider in Provider::ALL {
            let old_key = &previous.get(provider).api_key;
            let new = self.get_mut(provider);
            if !old_key.is_empty() && new.api_key == mask_key(old_key) {
                new.api_key = old_key.clone();
            }
        }
    }

    /// Merge a saved JSON document onto the defaults.
    pub fn merge_json(json: &str) -> serde_json::Result<Self> {
        let partial: PartialSettings = serde_json::from_str(json)?;
        let mut settings = Self::default();
        if let Some(provider) = partial.provider {
            settings.provider = provider;
        }
        for (provider, saved) in [
            (Provider::Gemini, partial.gemini),
            (Provider::OpenAi, partial.openai),
            (Provider::Anthropic, partial.anthropic),
            (Provider::IotTeam, partial.iotteam),
        ] {
            if let Some(saved) = saved {
                saved.merge_into(settings.get_mut(provider));
            }
        }
        Ok(settings)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialSettings {
    provider: Option<Provider>,
    gemini: Option<PartialProvider>,
    openai: Option<PartialProvider>,
    anthropic: Option<PartialProvider>,
    iotteam: Option<PartialProvider>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialProvider {
    api_key: Option<String>,
    model: Option<String>,
    #[serde(rename = "baseURL")]
    base_url: Option<String>,
}

impl PartialProvider {
    fn merge_into(self, target: &mut ProviderSettings) {
        if let Some(key) = self.api_key {
            target.api_key = key;
        }
        if let Some(model) = self.model {
            target.model = model;
        }
        if let Some(url) = self.base_url {
            target.base_url = Some(url);
        }
    }
}

/// AI settings backed by a JSON file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: AiSettings,
}

impl SettingsStore {
    /// Default settings file: `<config_dir>/factory-insight/ai-settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("factory-insight")
            .join("ai-settings.json")
    }

    /// Load from `path`, falling back to defaults when the file is missing or
    /// unparseable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(json) => match AiSettings::merge_json(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Failed to parse AI settings at {}: {}", path.display(), e);
                    AiSettings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No AI settings at {}, using defaults", path.display());
                AiSettings::default()
            }
            Err(e) => {
                warn!("Failed to read AI settings at {}: {}", path.display(), e);
                AiSettings::default()
            }
        };
        Self { path, settings }
    }

    /// Load from [`default_path`](Self::default_path).
    pub fn load_default() -> Self {
        Self::load(Self::default_path())
    }

    /// Settings file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings as stored.
    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    /// Settings with environment overrides applied; use these for requests.
    pub fn effective(&self) -> AiSettings {
        self.settings.clone().with_env_overrides()
    }

    /// Write `settings` out and replace the stored ones.
    ///
    /// The stored settings are left untouched when the write fails.
    pub fn update(&mut self, settings: AiSettings) -> Result<()> {
        self.write(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Write the settings to disk, creating the parent directory.
    pub fn save(&self) -> Result<()> {
        self.write(&self.settings)
    }

    fn write(&self, settings: &AiSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AiError::settings(parent, e))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| AiError::settings(&self.path, e))?;
        std::fs::write(&self.path, json).map_err(|e| AiError::settings(&self.path, e))?;
        debug!("Saved AI settings to {}", self.path.display());
        Ok(())
    }
}
