//! Prompt formatting from loaded context items
//!
//! The default formatter wraps the system instruction, each context item and
//! the user query in XML tags:
//!
//! ```text
//! <instructions>{system_instruction}</instructions>
//! <context>
//! <source index="1" title="..." url="...">{content}</source>
//! </context>
//! <query>{raw_text}</query>
//! ```

use serde::{Deserialize, Serialize};

/// A piece of loaded context (e.g. the text of a browser tab)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub content: String,
}

impl ContextItem {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            content: content.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A labelled section the UI can show alongside the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySection {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Characters of this item that made it into the prompt
    pub included_chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated_count: Option<usize>,
}

/// Output of a prompt formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPrompt {
    /// Never empty, even with zero context items
    pub formatted_prompt_text: String,
    pub display_sections: Vec<DisplaySection>,
    pub metadata: PromptMetadata,
}

/// Turns raw user input plus loaded context into the text sent to a provider
pub trait PromptFormatter: Send + Sync {
    fn format(&self, raw_text: &str, context_items: &[ContextItem]) -> FormattedPrompt;
}

/// XML-sectioned formatter with a total character budget for context
#[derive(Debug, Clone)]
pub struct BasicPromptFormatter {
    system_instruction: String,
    max_context_chars: usize,
}

impl Default for BasicPromptFormatter {
    fn default() -> Self {
        Self {
            system_instruction: "Answer the query using the provided context when it is relevant. \
                Cite sources by title when you rely on them."
                .to_string(),
            max_context_chars: 100_000,
        }
    }
}

impl BasicPromptFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Total characters of context content allowed into the prompt
    pub fn with_max_context_chars(mut self, max: usize) -> Self {
        self.max_context_chars = max;
        self
    }
}

impl PromptFormatter for BasicPromptFormatter {
    fn format(&self, raw_text: &str, context_items: &[ContextItem]) -> FormattedPrompt {
        let mut sections = Vec::with_capacity(3);
        let mut display_sections = Vec::with_capacity(context_items.len());
        let mut truncated_count = 0;

        if !self.system_instruction.trim().is_empty() {
            sections.push(format!("<instructions>\n{}\n</instructions>", self.system_instruction.trim()));
        }

        if !context_items.is_empty() {
            let mut remaining = self.max_context_chars;
            let mut sources = Vec::with_capacity(context_items.len());

            for (i, item) in context_items.iter().enumerate() {
                let total = item.content.chars().count();
                let included = total.min(remaining);
                if included < total {
                    truncated_count += 1;
                }
                remaining -= included;

                let content: String = item.content.chars().take(included).collect();
                let url_attr = item
                    .url
                    .as_deref()
                    .map(|u| format!(" url=\"{}\"", u))
                    .unwrap_or_default();
                sources.push(format!(
                    "<source index=\"{}\" title=\"{}\"{}>\n{}\n</source>",
                    i + 1,
                    item.title,
                    url_attr,
                    content
                ));
                display_sections.push(DisplaySection {
                    title: item.title.clone(),
                    url: item.url.clone(),
                    included_chars: included,
                });
            }

            sections.push(format!("<context>\n{}\n</context>", sources.join("\n")));
        }

        sections.push(format!("<query>\n{}\n</query>", raw_text.trim()));

        FormattedPrompt {
            formatted_prompt_text: sections.join("\n\n"),
            display_sections,
            metadata: PromptMetadata {
                truncated: (truncated_count > 0).then_some(true),
                truncated_count: (truncated_count > 0).then_some(truncated_count),
            },
        }
    }
}
