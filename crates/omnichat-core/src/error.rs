//! Conversation-level errors surfaced by the orchestrator

use thiserror::Error;

use crate::config::ConfigError;
use crate::conversation::StoreError;
use crate::providers::FormattedError;
use crate::registry::RegistryError;

/// Appended to network-like failures
pub const RETRY_HINT: &str = "Please check your connection and try again.";

/// Failures of a send, switch or model selection
#[derive(Error, Debug)]
pub enum ChatError {
    /// No provider is active; the user needs to add credentials
    #[error("No AI provider is configured. Add an API key in settings to start chatting.")]
    NoActiveProvider,

    #[error("{provider_type} does not support streaming responses")]
    StreamCapability { provider_type: String },

    /// Nothing to send; indicates a bug in message assembly
    #[error("no valid messages to send")]
    NoValidMessages,

    /// Regenerate requested with no prior user message
    #[error("there is no user message to regenerate a response for")]
    NoUserMessage,

    /// The stream stopped before any content arrived
    #[error("{0}")]
    InterruptedStream(String),

    #[error("{message} {hint}", hint = RETRY_HINT)]
    NetworkLike { message: String },

    #[error("{0}")]
    StreamFailure(String),

    /// Model selection named a model outside the available set
    #[error("model is not available: {0}")]
    ModelUnavailable(String),

    /// A provider switch was attempted while a response is streaming
    #[error("cannot switch providers while a response is streaming")]
    ProviderSwitchBlocked,

    /// Another send for this conversation has not finished yet
    #[error("a response is still in progress; wait for it or stop it first")]
    SendInProgress,

    /// A provider failure normalized by that provider's `format_error`
    #[error("{0}")]
    Provider(FormattedError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("settings error: {0}")]
    Settings(#[from] ConfigError),
}

impl ChatError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoActiveProvider => "no_active_provider",
            Self::StreamCapability { .. } => "stream_capability",
            Self::NoValidMessages => "no_valid_messages",
            Self::NoUserMessage => "no_user_message",
            Self::InterruptedStream(_) => "interrupted_stream",
            Self::NetworkLike { .. } => "network",
            Self::StreamFailure(_) => "stream_failure",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::ProviderSwitchBlocked => "provider_switch_blocked",
            Self::SendInProgress => "send_in_progress",
            Self::Provider(_) => "provider",
            Self::Registry(_) => "registry",
            Self::Store(_) => "store",
            Self::Settings(_) => "settings",
        }
    }

    /// Whether the user can reasonably retry the same action
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkLike { .. } | Self::InterruptedStream(_) | Self::StreamFailure(_) => true,
            Self::Provider(formatted) => formatted.retryable,
            _ => false,
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
