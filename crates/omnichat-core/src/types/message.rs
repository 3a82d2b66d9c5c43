//! Conversation and request message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stream::SearchResult;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message as sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Identifier of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// User message created, not yet answered
    Pending,
    /// User message answered successfully
    Sent,
    /// Assistant message receiving streamed content
    Streaming,
    /// Assistant message finalized
    Received,
    /// User message whose send failed
    Error,
}

impl MessageStatus {
    /// Whether the message has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Received | MessageStatus::Error)
    }
}

/// Per-message metadata.
///
/// Every field is optional so the same type doubles as a merge patch:
/// `merge` overwrites only the fields set on the patch and extends `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_tab_context: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Host-defined keys
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MessageMetadata {
    /// Merge `patch` into `self`, last write wins per field
    pub fn merge(&mut self, patch: MessageMetadata) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })*
            };
        }
        take!(
            thinking,
            thinking_streaming,
            search_results,
            response_id,
            model,
            provider_type,
            has_tab_context,
            truncated,
            truncated_count,
            partial,
            interrupted,
            error
        );
        self.extra.extend(patch.extra);
    }

    pub fn is_partial(&self) -> bool {
        self.partial.unwrap_or(false)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.unwrap_or(false)
    }
}

/// A message in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: MessageId,
    pub role: MessageRole,
    /// Text sent to (or received from) the provider
    pub content: String,
    /// Text shown to the user; may differ from `content` when a formatted
    /// prompt was sent in place of the raw input
    pub display_content: String,
    pub status: MessageStatus,
    pub metadata: MessageMetadata,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// Create a user message whose sent and displayed text differ
    pub fn user(content: impl Into<String>, display_content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into(), display_content.into(), MessageStatus::Pending)
    }

    /// Create an empty assistant placeholder ready to receive a stream
    pub fn assistant_placeholder() -> Self {
        Self::new(MessageRole::Assistant, String::new(), String::new(), MessageStatus::Streaming)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(MessageRole::System, content.clone(), content, MessageStatus::Received)
    }

    fn new(role: MessageRole, content: String, display_content: String, status: MessageStatus) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            display_content,
            status,
            metadata: MessageMetadata::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the message has any text to send
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Convert to the provider request shape
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}
