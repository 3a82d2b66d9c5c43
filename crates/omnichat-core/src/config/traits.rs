//! Settings model and store trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{ModelInfo, ProviderConfig};

/// User settings: enabled providers, model selection and the default provider.
///
/// This is the sole source of truth for which providers get built at startup
/// and which model is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,

    #[serde(default)]
    pub available_models: Vec<ModelInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider_type: Option<String>,
}

impl Settings {
    pub fn provider(&self, provider_type: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.provider_type.eq_ignore_ascii_case(provider_type))
    }

    /// Enabled provider configs in declaration order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    pub fn model(&self, model_id: &str) -> Option<&ModelInfo> {
        self.available_models.iter().find(|m| m.id == model_id)
    }

    pub fn is_model_available(&self, model_id: &str) -> bool {
        self.model(model_id).is_some()
    }

    /// The selected model's info, if it is in the available set
    pub fn selected_model_info(&self) -> Option<&ModelInfo> {
        self.selected_model.as_deref().and_then(|id| self.model(id))
    }
}

/// Settings storage abstraction
///
/// Implementations:
/// - `MemorySettingsStore`: in-memory, for tests and embedding hosts
/// - `FileSettingsStore`: YAML file (~/.config/omnichat/settings.yaml)
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Snapshot of the current settings
    async fn settings(&self) -> Settings;

    async fn set_selected_model(&self, model_id: Option<String>) -> ConfigResult<()>;

    async fn set_default_provider(&self, provider_type: Option<String>) -> ConfigResult<()>;

    async fn set_available_models(&self, models: Vec<ModelInfo>) -> ConfigResult<()>;

    /// Insert or replace the config for `config.provider_type`
    async fn upsert_provider(&self, config: ProviderConfig) -> ConfigResult<()>;

    async fn remove_provider(&self, provider_type: &str) -> ConfigResult<()>;
}

/// Errors that can occur during settings operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Shared upsert used by the store implementations
pub(crate) fn upsert_into(settings: &mut Settings, config: ProviderConfig) {
    match settings
        .providers
        .iter()
        .position(|p| p.provider_type.eq_ignore_ascii_case(&config.provider_type))
    {
        Some(pos) => settings.providers[pos] = config,
        None => settings.providers.push(config),
    }
}

pub(crate) fn remove_from(settings: &mut Settings, provider_type: &str) -> ConfigResult<()> {
    let original_len = settings.providers.len();
    settings
        .providers
        .retain(|p| !p.provider_type.eq_ignore_ascii_case(provider_type));

    if settings.providers.len() == original_len {
        Err(ConfigError::ProviderNotFound(provider_type.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_lookups() {
        let settings = Settings {
            providers: vec![
                ProviderConfig::new("openai"),
                ProviderConfig::new("anthropic").disabled(),
            ],
            selected_model: Some("gpt-4o".into()),
            available_models: vec![ModelInfo::new("gpt-4o", "openai")],
            default_provider_type: None,
        };

        assert!(settings.provider("OpenAI").is_some());
        assert_eq!(settings.enabled_providers().count(), 1);
        assert!(settings.is_model_available("gpt-4o"));
        assert!(!settings.is_model_available("claude"));
        assert_eq!(settings.selected_model_info().unwrap().provider_type, "openai");
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut settings = Settings::default();
        upsert_into(&mut settings, ProviderConfig::new("openai"));
        upsert_into(
            &mut settings,
            ProviderConfig::new("OPENAI").with_models(vec!["gpt-4o".into()]),
        );
        assert_eq!(settings.providers.len(), 1);
        assert_eq!(settings.providers[0].models, vec!["gpt-4o".to_string()]);

        remove_from(&mut settings, "openai").unwrap();
        assert!(matches!(
            remove_from(&mut settings, "openai"),
            Err(ConfigError::ProviderNotFound(_))
        ));
    }
}
