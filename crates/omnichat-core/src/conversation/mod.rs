//! Conversation log and per-conversation shared state

mod state;
mod store;

pub use state::{ActiveMessageGuard, ConversationState, SendGuard};
pub use store::{InMemoryMessageStore, MessageStore, StoreError, StoreResult};
