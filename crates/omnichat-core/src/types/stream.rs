//! Streaming response types

use serde::{Deserialize, Serialize};

/// A web search hit attached to a response by providers with search grounding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// One increment of a streamed response.
///
/// A chunk may carry any combination of fields. Chunks are consumed once
/// and folded into the target message; they are never stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    /// Visible response text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_delta: Option<String>,
    /// Reasoning / thinking text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_delta: Option<String>,
    /// Provider-scoped response identifier (continuity token candidate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
}

impl StreamChunk {
    /// Create a content chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content_delta: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create a thinking chunk
    pub fn thinking(text: impl Into<String>) -> Self {
        Self {
            thinking_delta: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create a chunk carrying only a response id
    pub fn response_id(id: impl Into<String>) -> Self {
        Self {
            response_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Create a chunk carrying only search results
    pub fn search_results(results: Vec<SearchResult>) -> Self {
        Self {
            search_results: Some(results),
            ..Default::default()
        }
    }

    /// Attach a response id
    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Check if this chunk carries visible text
    pub fn has_content(&self) -> bool {
        self.content_delta.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Check if this chunk carries thinking text
    pub fn has_thinking(&self) -> bool {
        self.thinking_delta.as_deref().is_some_and(|t| !t.is_empty())
    }
}
