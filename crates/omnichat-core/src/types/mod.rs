//! Core types for conversations and provider interactions
//!
//! This module contains the shared types used across providers, the
//! registry, the streaming consumer and the orchestrator.

mod message;
mod model;
mod stream;
mod cancellation;

pub use message::{
    ChatMessage, ConversationMessage, MessageId, MessageMetadata, MessageRole, MessageStatus,
};
pub use model::{CapabilityFlag, ConfigValidation, ModelInfo, ProviderCapabilities, ProviderConfig};
pub use stream::{SearchResult, StreamChunk};
pub use cancellation::CancellationToken;
