//! Provider trait definition

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::types::{
    CancellationToken, CapabilityFlag, ChatMessage, ConfigValidation, ModelInfo,
    ProviderCapabilities, ProviderConfig, StreamChunk,
};
use super::error::{FormattedError, ProviderError, ProviderResult};

/// Options for chat and streaming chat requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Model id to use; providers fall back to their configured default
    pub model: Option<String>,
    /// System instruction text
    pub system_prompt: Option<String>,
    /// Continuity token from a previous response of the same provider
    pub previous_response_id: Option<String>,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the continuity token
    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// A complete (non-streamed) chat response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Lazy, finite, non-restartable sequence of chunks
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// Capability contract every chat backend implements
///
/// Providers are built by a [`ProviderFactory`](super::ProviderFactory),
/// initialized once, then shared read-only through the registry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique type tag (e.g., "openai", "anthropic")
    fn provider_type(&self) -> &str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// Declared capabilities
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Configuration the provider was initialized with
    fn config(&self) -> &ProviderConfig;

    /// Apply configuration and probe the backend.
    ///
    /// Fails with [`ProviderError::Configuration`] on bad config and
    /// [`ProviderError::Connectivity`] when the probe fails.
    async fn initialize(&mut self, config: ProviderConfig) -> ProviderResult<()>;

    /// Check a configuration without applying it
    fn validate_config(&self, config: &ProviderConfig) -> ConfigValidation;

    /// Probe the backend with the current configuration
    async fn test_connection(&self) -> bool;

    /// Single-shot chat completion
    async fn chat(&self, messages: Vec<ChatMessage>, options: ChatOptions) -> ProviderResult<ChatResponse>;

    /// Streaming chat completion
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;

    /// Models this provider offers
    fn get_models(&self) -> Vec<ModelInfo>;

    /// Look up one model by id
    fn get_model(&self, id: &str) -> Option<ModelInfo> {
        self.get_models().into_iter().find(|m| m.id == id)
    }

    /// Normalize a failure into the shape shown to users
    fn format_error(&self, error: &ProviderError) -> FormattedError {
        FormattedError::from_provider_error(self.provider_type(), error)
    }

    /// Shorthand for the streaming capability flag
    fn supports_streaming(&self) -> bool {
        self.capabilities().supports(CapabilityFlag::Streaming)
    }
}
