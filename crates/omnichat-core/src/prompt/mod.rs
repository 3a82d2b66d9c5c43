//! Prompt assembly for the first turn of a conversation with loaded context

mod formatter;

pub use formatter::{
    BasicPromptFormatter, ContextItem, DisplaySection, FormattedPrompt, PromptFormatter, PromptMetadata,
};
