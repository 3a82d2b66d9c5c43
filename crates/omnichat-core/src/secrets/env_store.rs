//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Conventional variables per provider type, checked after the
/// `OMNICHAT_<TYPE>_API_KEY` override
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("mistral", vec!["MISTRAL_API_KEY"]);
    m.insert("azure", vec!["AZURE_API_KEY", "AZURE_OPENAI_API_KEY"]);
    m.insert("openrouter", vec!["OPENROUTER_API_KEY"]);
    m.insert("deepseek", vec!["DEEPSEEK_API_KEY"]);
    m.insert("groq", vec!["GROQ_API_KEY"]);
    m.insert("xai", vec!["XAI_API_KEY", "GROK_API_KEY"]);
    m.insert("ollama", vec![]); // Local, no key
    m
});

/// Read-only secret store backed by environment variables
///
/// Lookup order for `get("openai")`:
/// 1. the key itself as a variable name (`openai`)
/// 2. `OMNICHAT_OPENAI_API_KEY`
/// 3. the conventional variables (`OPENAI_API_KEY`)
/// 4. `OPENAI_API_KEY` derived from the key for unmapped types
///
/// Empty variables are treated as unset.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Conventional variable names for a provider type
    pub fn env_vars_for_provider(provider_type: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP
            .get(provider_type.to_lowercase().as_str())
            .map(|v| v.as_slice())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = non_empty_var(key) {
            return Some(value);
        }

        let upper = key.to_uppercase();
        if let Some(value) = non_empty_var(&format!("OMNICHAT_{}_API_KEY", upper)) {
            return Some(value);
        }

        if let Some(vars) = Self::env_vars_for_provider(key) {
            return vars.iter().find_map(|v| non_empty_var(v));
        }

        non_empty_var(&format!("{}_API_KEY", upper))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_read_only() {
        let store = EnvSecretStore::new();
        assert_eq!(store.name(), "env");
        assert!(matches!(store.store("test", "value"), Err(SecretStoreError::ReadOnly)));
        assert!(matches!(store.delete("test"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_mapped_variable() {
        env::set_var("DEEPSEEK_API_KEY", "ds-test");

        let store = EnvSecretStore::new();
        assert_eq!(store.api_key("deepseek"), Some("ds-test".to_string()));
        assert_eq!(store.api_key("DeepSeek"), Some("ds-test".to_string()));

        env::remove_var("DEEPSEEK_API_KEY");
    }

    #[test]
    fn test_env_store_prefixed_override_wins() {
        env::set_var("OMNICHAT_GROQ_API_KEY", "override");
        env::set_var("GROQ_API_KEY", "conventional");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("groq"), Some("override".to_string()));

        env::remove_var("OMNICHAT_GROQ_API_KEY");
        assert_eq!(store.get("groq"), Some("conventional".to_string()));

        env::remove_var("GROQ_API_KEY");
    }

    #[test]
    fn test_env_store_derived_name_for_unmapped_type() {
        env::set_var("CUSTOMBACKEND_API_KEY", "custom");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("custombackend"), Some("custom".to_string()));
        assert!(store.get_info("custombackend").available);

        env::remove_var("CUSTOMBACKEND_API_KEY");
        assert!(!store.has("custombackend"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let store = EnvSecretStore::new();
        assert_eq!(EnvSecretStore::env_vars_for_provider("ollama"), Some(&[][..]));
        assert_eq!(store.get("ollama_nonexistent_xyz"), None);
    }
}
