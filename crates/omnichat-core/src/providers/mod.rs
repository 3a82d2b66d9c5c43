//! Provider capability contract and implementations
//!
//! A provider wraps one chat backend (authentication, request shape,
//! streaming semantics) behind the [`Provider`] trait. The wire transport of
//! each backend lives outside this crate; implementations register with the
//! factory by type tag.
//!
//! The `MockProvider` is kept for testing and as the built-in `mock` type.

mod traits;
mod error;
mod factory;
mod mock;

pub use traits::{ChatOptions, ChatResponse, Provider, StreamResponse};
pub use error::{is_network_like_message, FormattedError, ProviderError, ProviderResult};
pub use factory::{
    create_provider, has_provider_constructor, list_provider_constructors,
    register_provider_constructor, unregister_provider_constructor, ConstructorDefinition,
    DefaultProviderFactory, ProviderConstructor, ProviderFactory,
};
pub use mock::{MockConfig, MockMode, MockProvider, MockStep, RecordedRequest};

/// Provider type tags the registry recognizes
pub fn supported_providers() -> Vec<&'static str> {
    vec![
        "openai",
        "anthropic",
        "gemini",
        "ollama",
        "openrouter",
        "mistral",
        "deepseek",
        "groq",
        "xai",
        "azure",
        // Testing
        "mock",
    ]
}
