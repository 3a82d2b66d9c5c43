//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory secret store for tests and hosts that hand keys over at startup
///
/// Keys are normalized to lowercase so `"OpenAI"` and `"openai"` match.
///
/// # Example
///
/// ```
/// use omnichat_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new().with_key("openai", "sk-test");
/// assert_eq!(store.api_key("OpenAI"), Some("sk-test".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, key: &str, value: &str) -> Self {
        self.secrets.write().insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn clear(&self) {
        self.secrets.write().clear();
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(&key.to_lowercase()).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_lowercase(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(&key.to_lowercase());
        Ok(())
    }
}
