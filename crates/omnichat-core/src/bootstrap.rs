//! Build and register providers from settings at startup

use crate::config::SettingsStore;
use crate::logging::SharedLogger;
use crate::providers::{ProviderError, ProviderFactory};
use crate::registry::ProviderRegistry;
use crate::secrets::SecretStore;
use crate::{log_info, log_warn};

/// A provider that could not be built or registered
#[derive(Debug)]
pub struct BootstrapFailure {
    pub provider_type: String,
    pub error: ProviderError,
}

/// Outcome of `bootstrap_providers`
#[derive(Debug, Default)]
pub struct BootstrapReport {
    /// Registered provider types, in settings order
    pub registered: Vec<String>,
    pub failed: Vec<BootstrapFailure>,
    /// The provider made active, if any
    pub active: Option<String>,
}

impl BootstrapReport {
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

/// Build every enabled provider in `settings`, register the ones that
/// initialize, and activate the default (or the first registered).
///
/// Failures are isolated per provider and reported, never returned.
pub async fn bootstrap_providers(
    registry: &ProviderRegistry,
    factory: &dyn ProviderFactory,
    settings: &dyn SettingsStore,
    secrets: &dyn SecretStore,
    logger: &SharedLogger,
) -> BootstrapReport {
    let settings = settings.settings().await;
    let mut report = BootstrapReport::default();

    for config in settings.enabled_providers() {
        let provider_type = config.provider_type.clone();
        let mut config = config.clone();
        if let Some(key) = secrets.api_key(&provider_type) {
            config.api_key = Some(key);
        }

        let built = match factory.create(&provider_type, config).await {
            Ok(provider) => registry
                .register(provider)
                .map_err(|e| ProviderError::configuration(&provider_type, e.to_string())),
            Err(e) => Err(e),
        };

        match built {
            Ok(()) => report.registered.push(provider_type),
            Err(error) => {
                log_warn!(logger, "[Bootstrap] Skipping provider '{}': {}", provider_type, error);
                report.failed.push(BootstrapFailure { provider_type, error });
            }
        }
    }

    let preferred = settings
        .default_provider_type
        .as_deref()
        .filter(|t| registry.has_provider(t))
        .map(str::to_string)
        .or_else(|| report.registered.first().cloned());

    if let Some(provider_type) = preferred {
        match registry.set_active_provider(&provider_type) {
            Ok(()) => report.active = Some(provider_type),
            Err(e) => log_warn!(logger, "[Bootstrap] Could not activate '{}': {}", provider_type, e),
        }
    }

    log_info!(
        logger,
        "[Bootstrap] {} providers registered, {} failed, active: {}",
        report.registered.len(),
        report.failed.len(),
        report.active.as_deref().unwrap_or("none")
    );
    report
}
