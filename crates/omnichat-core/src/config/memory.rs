//! In-memory settings store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{remove_from, upsert_into, ConfigResult, Settings, SettingsStore};
use crate::types::{ModelInfo, ProviderConfig};

/// In-memory settings store for testing and embedding hosts
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Replace everything at once (useful for testing)
    pub fn replace(&self, settings: Settings) {
        *self.settings.write() = settings;
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    async fn set_selected_model(&self, model_id: Option<String>) -> ConfigResult<()> {
        self.settings.write().selected_model = model_id;
        Ok(())
    }

    async fn set_default_provider(&self, provider_type: Option<String>) -> ConfigResult<()> {
        self.settings.write().default_provider_type = provider_type;
        Ok(())
    }

    async fn set_available_models(&self, models: Vec<ModelInfo>) -> ConfigResult<()> {
        self.settings.write().available_models = models;
        Ok(())
    }

    async fn upsert_provider(&self, config: ProviderConfig) -> ConfigResult<()> {
        upsert_into(&mut self.settings.write(), config);
        Ok(())
    }

    async fn remove_provider(&self, provider_type: &str) -> ConfigResult<()> {
        remove_from(&mut self.settings.write(), provider_type)
    }
}
