//! OmniChat Core
//!
//! Provider orchestration and the streaming response pipeline for a chat
//! client that talks to several interchangeable AI backends.
//!
//! - `registry`: registered providers, the active one, lifecycle events
//! - `streaming`: folds one response stream into an assistant message
//! - `orchestrator`: the send-message state machine with model overrides,
//!   cancellation and guaranteed cleanup
//!
//! Backend wire protocols live outside this crate; implementations plug in
//! through the `Provider` trait and the provider factory.
//!
//! ```rust,ignore
//! use omnichat_core::{MessageOrchestrator, SendOptions};
//!
//! let report = bootstrap_providers(&registry, &factory, &*settings, &secrets, &logger).await;
//! let orchestrator = MessageOrchestrator::new(registry, store, settings, logger);
//!
//! orchestrator.send_message("Hello", SendOptions::new()).await?;
//! orchestrator.cancel_message();
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod secrets;
pub mod providers;
pub mod registry;
pub mod conversation;
pub mod prompt;
pub mod streaming;
pub mod orchestrator;
pub mod bootstrap;
pub mod error;

// Re-export commonly used types
pub use types::{
    CancellationToken, CapabilityFlag, ChatMessage, ConversationMessage, MessageId,
    MessageMetadata, MessageRole, MessageStatus, ModelInfo, ProviderCapabilities,
    ProviderConfig, SearchResult, StreamChunk,
};

pub use logging::{Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use config::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};

pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore};

pub use providers::{
    create_provider, register_provider_constructor, supported_providers, ChatOptions,
    DefaultProviderFactory, FormattedError, MockProvider, Provider, ProviderError,
    ProviderFactory, ProviderResult,
};

pub use registry::{ProviderRegistry, RegistryError, RegistryEvent, RegistryEventKind};

pub use conversation::{ConversationState, InMemoryMessageStore, MessageStore};

pub use prompt::{BasicPromptFormatter, ContextItem, PromptFormatter};

pub use streaming::{StreamOutcome, StreamingConsumer};

pub use orchestrator::{MessageOrchestrator, OrchestratorStats, SendOptions, SendOutcome};

pub use bootstrap::{bootstrap_providers, BootstrapReport};

pub use error::{ChatError, ChatResult};
