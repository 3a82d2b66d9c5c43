//! Provider factory: builds initialized providers from configuration
//!
//! Backend implementations register a constructor under their type tag; the
//! factory instantiates one and runs `initialize(config)` on it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::error::{ProviderError, ProviderResult};
use super::mock::MockProvider;
use super::traits::Provider;
use crate::logging::SharedLogger;
use crate::types::ProviderConfig;

/// Constructor for an uninitialized provider instance
pub type ProviderConstructor = Box<dyn Fn(SharedLogger) -> Box<dyn Provider> + Send + Sync>;

/// A registered provider implementation
pub struct ConstructorDefinition {
    /// Provider type tag
    pub provider_type: String,
    /// Human-readable description
    pub description: String,
    /// Constructor
    pub constructor: ProviderConstructor,
}

impl std::fmt::Debug for ConstructorDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorDefinition")
            .field("provider_type", &self.provider_type)
            .field("description", &self.description)
            .finish()
    }
}

/// Global table of provider implementations
static CONSTRUCTORS: Lazy<RwLock<HashMap<String, ConstructorDefinition>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "mock".to_string(),
        ConstructorDefinition {
            provider_type: "mock".to_string(),
            description: "Deterministic echo provider for testing".to_string(),
            constructor: Box::new(|logger| Box::new(MockProvider::echo(logger))),
        },
    );

    RwLock::new(map)
});

/// Register (or replace) the implementation for a provider type
pub fn register_provider_constructor(
    provider_type: &str,
    description: &str,
    constructor: ProviderConstructor,
) {
    CONSTRUCTORS.write().insert(
        provider_type.to_lowercase(),
        ConstructorDefinition {
            provider_type: provider_type.to_lowercase(),
            description: description.to_string(),
            constructor,
        },
    );
}

/// Remove the implementation for a provider type (mainly for testing)
pub fn unregister_provider_constructor(provider_type: &str) -> bool {
    CONSTRUCTORS.write().remove(&provider_type.to_lowercase()).is_some()
}

/// Check if an implementation is registered for a type
pub fn has_provider_constructor(provider_type: &str) -> bool {
    CONSTRUCTORS.read().contains_key(&provider_type.to_lowercase())
}

/// List registered implementations as (type, description) pairs
pub fn list_provider_constructors() -> Vec<(String, String)> {
    let mut list: Vec<_> = CONSTRUCTORS
        .read()
        .values()
        .map(|def| (def.provider_type.clone(), def.description.clone()))
        .collect();
    list.sort();
    list
}

/// Instantiate and initialize a provider of the given type
pub async fn create_provider(
    provider_type: &str,
    config: ProviderConfig,
    logger: SharedLogger,
) -> ProviderResult<Box<dyn Provider>> {
    let mut provider = {
        let constructors = CONSTRUCTORS.read();
        let def = constructors.get(&provider_type.to_lowercase()).ok_or_else(|| {
            ProviderError::configuration(provider_type, "no implementation registered for this provider type")
        })?;
        (def.constructor)(Arc::clone(&logger))
    };

    provider.initialize(config).await?;
    Ok(provider)
}

/// Builds initialized providers from persisted configuration
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, provider_type: &str, config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>>;
}

/// Factory backed by the global constructor table
pub struct DefaultProviderFactory {
    logger: SharedLogger,
}

impl DefaultProviderFactory {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    async fn create(&self, provider_type: &str, config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
        let provider = create_provider(provider_type, config, Arc::clone(&self.logger)).await?;
        Ok(Arc::from(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_builtin_mock_registered() {
        assert!(has_provider_constructor("mock"));
        assert!(has_provider_constructor("MOCK"));
        let list = list_provider_constructors();
        assert!(list.iter().any(|(t, _)| t == "mock"));
    }

    #[tokio::test]
    async fn test_create_mock_provider() {
        let provider = create_provider("mock", ProviderConfig::new("mock"), NoOpLogger::shared())
            .await
            .unwrap();
        assert_eq!(provider.provider_type(), "mock");
    }

    #[tokio::test]
    async fn test_create_unknown_type_fails_with_configuration_error() {
        let result = create_provider("nonexistent_xyz", ProviderConfig::new("nonexistent_xyz"), NoOpLogger::shared()).await;
        assert!(matches!(result, Err(ProviderError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_register_custom_constructor() {
        register_provider_constructor(
            "factory_test_custom",
            "custom",
            Box::new(|logger| Box::new(MockProvider::new(logger).with_type("factory_test_custom"))),
        );

        let factory = DefaultProviderFactory::new(NoOpLogger::shared());
        let provider = factory
            .create("factory_test_custom", ProviderConfig::new("factory_test_custom"))
            .await
            .unwrap();
        assert_eq!(provider.provider_type(), "factory_test_custom");

        assert!(unregister_provider_constructor("factory_test_custom"));
        assert!(!has_provider_constructor("factory_test_custom"));
    }

    #[tokio::test]
    async fn test_initialize_failure_propagates() {
        register_provider_constructor(
            "factory_test_offline",
            "offline",
            Box::new(|logger| Box::new(MockProvider::new(logger).with_failing_probe())),
        );

        let result = create_provider(
            "factory_test_offline",
            ProviderConfig::new("factory_test_offline"),
            NoOpLogger::shared(),
        )
        .await;
        assert!(matches!(result, Err(ProviderError::Connectivity { .. })));

        unregister_provider_constructor("factory_test_offline");
    }
}
