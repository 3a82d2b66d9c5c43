//! Orchestrator request and report types

use serde::{Deserialize, Serialize};

use crate::types::{MessageId, MessageMetadata};

/// Options for one `send_message` call
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Regenerate: reuse the last user message instead of creating one
    pub skip_user_message: bool,
    /// Text to show in place of the raw input
    pub display_content: Option<String>,
    /// Extra metadata merged into the user message
    pub metadata: Option<MessageMetadata>,
    /// Use this model for this send only, switching provider if needed
    pub model_override: Option<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regenerate() -> Self {
        Self {
            skip_user_message: true,
            ..Default::default()
        }
    }

    pub fn with_display_content(mut self, display: impl Into<String>) -> Self {
        self.display_content = Some(display.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_model_override(mut self, model_id: impl Into<String>) -> Self {
        self.model_override = Some(model_id.into());
        self
    }
}

/// How a send ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty or whitespace-only input; nothing changed
    Ignored,
    Completed {
        user_message_id: MessageId,
        assistant_message_id: MessageId,
        /// The response was cut short but kept
        partial: bool,
    },
}

impl SendOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, SendOutcome::Ignored)
    }
}

/// A model override applied for the duration of one send.
///
/// Restored on every exit path of the send; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOverrideContext {
    pub requested_model: String,
    pub original_model: Option<String>,
    pub original_provider_type: String,
    pub switched_provider: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStats {
    pub active_provider_type: Option<String>,
    pub registered_provider_types: Vec<String>,
    pub message_count: usize,
    pub is_streaming: bool,
}
