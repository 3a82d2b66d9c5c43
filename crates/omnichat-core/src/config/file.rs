//! File-based settings store (YAML)
//!
//! Lives at `~/.config/omnichat/settings.yaml` by default. API keys are never
//! written here; they come from a `SecretStore`.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{remove_from, upsert_into, ConfigResult, Settings, SettingsStore};
use crate::types::{ModelInfo, ProviderConfig};

/// File-based settings store
///
/// Reads lazily, caches the parsed file and writes through on every change.
///
/// # Example
///
/// ```no_run
/// use omnichat_core::config::FileSettingsStore;
///
/// let store = FileSettingsStore::user();
/// let scratch = FileSettingsStore::new("/tmp/omnichat/settings.yaml");
/// ```
pub struct FileSettingsStore {
    path: PathBuf,
    cache: RwLock<Option<Settings>>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// User-level settings (~/.config/omnichat/settings.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("omnichat").join("settings.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, settings: &Settings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(settings)?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(settings.clone());
        Ok(())
    }

    /// Cached settings, loading on first use
    fn current(&self) -> ConfigResult<Settings> {
        if let Some(settings) = self.cache.read().as_ref() {
            return Ok(settings.clone());
        }

        let settings = self.load()?;
        *self.cache.write() = Some(settings.clone());
        Ok(settings)
    }

    fn modify(&self, edit: impl FnOnce(&mut Settings) -> ConfigResult<()>) -> ConfigResult<()> {
        let mut settings = self.current()?;
        edit(&mut settings)?;
        self.save(&settings)
    }

    /// Re-read from disk, discarding the cache
    pub fn reload(&self) -> ConfigResult<Settings> {
        let settings = self.load()?;
        *self.cache.write() = Some(settings.clone());
        Ok(settings)
    }

    /// Copy the current file next to itself as `settings.yaml.backup`
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsStore")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn settings(&self) -> Settings {
        // A malformed file reads as empty settings; writes surface the error
        self.current().unwrap_or_default()
    }

    async fn set_selected_model(&self, model_id: Option<String>) -> ConfigResult<()> {
        self.modify(|s| {
            s.selected_model = model_id;
            Ok(())
        })
    }

    async fn set_default_provider(&self, provider_type: Option<String>) -> ConfigResult<()> {
        self.modify(|s| {
            s.default_provider_type = provider_type;
            Ok(())
        })
    }

    async fn set_available_models(&self, models: Vec<ModelInfo>) -> ConfigResult<()> {
        self.modify(|s| {
            s.available_models = models;
            Ok(())
        })
    }

    async fn upsert_provider(&self, config: ProviderConfig) -> ConfigResult<()> {
        self.modify(|s| {
            upsert_into(s, config);
            Ok(())
        })
    }

    async fn remove_provider(&self, provider_type: &str) -> ConfigResult<()> {
        self.modify(|s| remove_from(s, provider_type))
    }
}
