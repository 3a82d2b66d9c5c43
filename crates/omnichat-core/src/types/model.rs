//! Model, capability and provider configuration types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A boolean capability a provider declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapabilityFlag {
    Streaming,
    Temperature,
    Reasoning,
    Thinking,
    Multimodal,
    FunctionCalling,
}

impl CapabilityFlag {
    /// Every flag a complete capability declaration must contain
    pub const ALL: [CapabilityFlag; 6] = [
        CapabilityFlag::Streaming,
        CapabilityFlag::Temperature,
        CapabilityFlag::Reasoning,
        CapabilityFlag::Thinking,
        CapabilityFlag::Multimodal,
        CapabilityFlag::FunctionCalling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityFlag::Streaming => "streaming",
            CapabilityFlag::Temperature => "temperature",
            CapabilityFlag::Reasoning => "reasoning",
            CapabilityFlag::Thinking => "thinking",
            CapabilityFlag::Multimodal => "multimodal",
            CapabilityFlag::FunctionCalling => "functionCalling",
        }
    }
}

impl std::fmt::Display for CapabilityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities a provider declares.
///
/// Flags are kept as an explicit map so a declaration that omits a flag is
/// distinguishable from one that sets it to `false`; the registry refuses
/// incomplete declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCapabilities {
    #[serde(flatten)]
    pub flags: BTreeMap<CapabilityFlag, bool>,
    #[serde(default)]
    pub max_context_length: u32,
    #[serde(default)]
    pub supported_models: Vec<String>,
}

impl ProviderCapabilities {
    /// Create an empty declaration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a complete declaration with every flag enabled
    pub fn full(max_context_length: u32) -> Self {
        Self {
            flags: CapabilityFlag::ALL.iter().map(|f| (*f, true)).collect(),
            max_context_length,
            supported_models: Vec::new(),
        }
    }

    /// Create a complete declaration with only streaming enabled
    pub fn streaming_only(max_context_length: u32) -> Self {
        Self {
            flags: CapabilityFlag::ALL
                .iter()
                .map(|f| (*f, *f == CapabilityFlag::Streaming))
                .collect(),
            max_context_length,
            supported_models: Vec::new(),
        }
    }

    /// Set a flag
    pub fn with_flag(mut self, flag: CapabilityFlag, enabled: bool) -> Self {
        self.flags.insert(flag, enabled);
        self
    }

    /// Remove a flag from the declaration
    pub fn without_flag(mut self, flag: CapabilityFlag) -> Self {
        self.flags.remove(&flag);
        self
    }

    /// Set the supported model ids
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = models;
        self
    }

    /// Whether a flag is declared and enabled
    pub fn supports(&self, flag: CapabilityFlag) -> bool {
        self.flags.get(&flag).copied().unwrap_or(false)
    }

    /// Flags absent from the declaration
    pub fn missing_flags(&self) -> Vec<CapabilityFlag> {
        CapabilityFlag::ALL
            .iter()
            .filter(|f| !self.flags.contains_key(f))
            .copied()
            .collect()
    }

    /// Whether every flag is declared and the context length is set
    pub fn is_complete(&self) -> bool {
        self.missing_flags().is_empty() && self.max_context_length > 0
    }
}

/// A model offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model identifier as used by the provider's API
    pub id: String,
    /// Display name
    pub name: String,
    /// Provider type this model belongs to
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, provider_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider_type: provider_type.into(),
            context_length: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_context_length(mut self, length: u32) -> Self {
        self.context_length = Some(length);
        self
    }
}

/// Provider configuration as persisted in settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider type tag (e.g. 'openai', 'anthropic', 'mock')
    pub provider_type: String,
    /// Whether this provider is enabled (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// API key; resolved from the secret store at runtime, never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Custom API base URL (optional, uses provider default if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model ids to expose
    #[serde(default)]
    pub models: Vec<String>,
    /// Backend-specific options, opaque to this crate
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    /// Create a new provider configuration
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            enabled: true,
            api_key: None,
            api_base: None,
            models: vec![],
            options: serde_json::Map::new(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Add models to the provider
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set a backend-specific option
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Disable the provider
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Outcome of validating a provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Valid exactly when `errors` is empty
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}
