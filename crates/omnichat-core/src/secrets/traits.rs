//! Core traits and types for credential storage

use thiserror::Error;

/// Information about a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInfo {
    /// Whether the secret exists
    pub available: bool,
    /// Which store provided the secret
    pub source: String,
}

impl SecretInfo {
    pub fn new(available: bool, source: impl Into<String>) -> Self {
        Self {
            available,
            source: source.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            available: false,
            source: "none".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Source of provider API keys
///
/// Keys are looked up by provider type (e.g. `"openai"`). Encrypted storage
/// belongs to the host; this crate only reads through the trait.
///
/// # Example
///
/// ```
/// use omnichat_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// // store.api_key("openai") checks OMNICHAT_OPENAI_API_KEY, then OPENAI_API_KEY
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    fn get(&self, key: &str) -> Option<String>;

    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support writing.
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support deletion.
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// API key for a provider type; blank values count as missing
    fn api_key(&self, provider_type: &str) -> Option<String> {
        self.get(provider_type).filter(|k| !k.trim().is_empty())
    }

    fn get_info(&self, key: &str) -> SecretInfo {
        if self.has(key) {
            SecretInfo::new(true, self.name())
        } else {
            SecretInfo::not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_info() {
        let info = SecretInfo::new(true, "test");
        assert!(info.available);
        assert_eq!(info.source, "test");

        let not_found = SecretInfo::not_found();
        assert!(!not_found.available);
        assert_eq!(not_found.source, "none");
    }
}
