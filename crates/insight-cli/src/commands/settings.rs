//! Settings command implementation.

use std::path::PathBuf;

use anyhow::Result;

use insight_ai::{Provider, SettingsStore};

use crate::cli::{OutputFormat, SettingsAction};
use crate::format::{FormatOptions, format_json, format_settings_text};
use crate::util::write_output;

pub fn cmd_settings(
    path: PathBuf,
    action: Option<SettingsAction>,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let mut store = SettingsStore::load(path);
    let content = apply(&mut store, action, opts)?;
    write_output(output, &content)
}

/// Apply `action` to the store and describe the result.
fn apply(store: &mut SettingsStore, action: Option<SettingsAction>, opts: &FormatOptions) -> Result<String> {
    let action = action.unwrap_or(SettingsAction::Show {
        output: crate::cli::OutputArgs {
            format: OutputFormat::Text,
        },
    });

    let target = |p: Option<Provider>, store: &SettingsStore| p.unwrap_or(store.settings().provider);
    let mut settings = store.settings().clone();

    let message = match action {
        SettingsAction::Show { output } => {
            let masked = store.settings().masked();
            return match output.format {
                OutputFormat::Json => format_json(&masked, opts),
                OutputFormat::Text => Ok(format_settings_text(&masked, store.path(), opts)),
            };
        }
        SettingsAction::Path => return Ok(format!("{}\n", store.path().display())),
        SettingsAction::Provider { provider } => {
            settings.provider = provider;
            format!("Active provider set to {}", provider.label())
        }
        SettingsAction::Key { provider, key } => {
            let provider = target(provider, store);
            settings.get_mut(provider).api_key = key.trim().to_string();
            if key.trim().is_empty() {
                format!("API key for {} cleared", provider.label())
            } else {
                format!("API key for {} updated", provider.label())
            }
        }
        SettingsAction::Model { provider, model } => {
            let provider = target(provider, store);
            settings.get_mut(provider).model = model.trim().to_string();
            format!("Model for {} set to {}", provider.label(), model.trim())
        }
        SettingsAction::BaseUrl { provider, url } => {
            let provider = target(provider, store);
            let url = url.trim();
            settings.get_mut(provider).base_url = (!url.is_empty()).then(|| url.to_string());
            format!("Base URL for {} set to '{}'", provider.label(), url)
        }
    };

    store.update(settings)?;
    Ok(format!("{message}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::load(dir.path().join("ai-settings.json"))
    }

    #[test]
    fn test_key_defaults_to_active_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        let opts = FormatOptions::default();

        apply(&mut s, Some(SettingsAction::Provider { provider: Provider::Anthropic }), &opts).unwrap();
        let msg = apply(
            &mut s,
            Some(SettingsAction::Key {
                provider: None,
                key: " ant-key-123456 ".into(),
            }),
            &opts,
        )
        .unwrap();
        assert_eq!(msg, "API key for Anthropic updated\n");

        let reloaded = store(&dir);
        assert_eq!(reloaded.settings().provider, Provider::Anthropic);
        assert_eq!(reloaded.settings().anthropic.api_key, "ant-key-123456");
    }

    #[test]
    fn test_show_masks_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        let opts = FormatOptions {
            no_color: true,
            compact: true,
        };
        apply(
            &mut s,
            Some(SettingsAction::Key {
                provider: Some(Provider::OpenAi),
                key: "sk-secret-9876".into(),
            }),
            &opts,
        )
        .unwrap();

        let json = apply(
            &mut s,
            Some(SettingsAction::Show {
                output: crate::cli::OutputArgs {
                    format: OutputFormat::Json,
                },
            }),
            &opts,
        )
        .unwrap();
        assert!(json.contains("****9876"));
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_blank_base_url_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = store(&dir);
        let opts = FormatOptions::default();
        apply(
            &mut s,
            Some(SettingsAction::BaseUrl {
                provider: Some(Provider::IotTeam),
                url: "  ".into(),
            }),
            &opts,
        )
        .unwrap();
        assert_eq!(s.settings().iotteam.base_url, None);
    }
}
