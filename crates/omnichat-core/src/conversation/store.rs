//! Message store: CRUD over conversation messages addressed by id

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{ConversationMessage, MessageId, MessageMetadata, MessageRole, MessageStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("message not found: {0}")]
    NotFound(MessageId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for the conversation log.
///
/// The orchestrator and the streaming consumer both write to the same record
/// incrementally, so content appends and metadata merges must be atomic per
/// call and must never overwrite fields they don't touch.
pub trait MessageStore: Send + Sync {
    /// Append a message to the log and return its id
    fn create(&self, message: ConversationMessage) -> MessageId;

    fn get(&self, id: MessageId) -> Option<ConversationMessage>;

    /// All messages in creation order
    fn list(&self) -> Vec<ConversationMessage>;

    fn append_content(&self, id: MessageId, delta: &str) -> StoreResult<()>;

    fn merge_metadata(&self, id: MessageId, patch: MessageMetadata) -> StoreResult<()>;

    fn set_status(&self, id: MessageId, status: MessageStatus) -> StoreResult<()>;

    /// Apply an arbitrary in-place edit
    fn update(&self, id: MessageId, edit: &mut dyn FnMut(&mut ConversationMessage)) -> StoreResult<()>;

    /// Remove a message. Returns false if it did not exist.
    fn delete(&self, id: MessageId) -> bool;

    fn clear(&self);

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent message with the given role
    fn last_with_role(&self, role: MessageRole) -> Option<ConversationMessage> {
        self.list().into_iter().rev().find(|m| m.role == role)
    }

    fn count_role(&self, role: MessageRole) -> usize {
        self.list().iter().filter(|m| m.role == role).count()
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    messages: HashMap<MessageId, ConversationMessage>,
    order: Vec<MessageId>,
}

/// In-memory message store
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_message<T>(&self, id: MessageId, f: impl FnOnce(&mut ConversationMessage) -> T) -> StoreResult<T> {
        let mut inner = self.inner.write();
        let message = inner.messages.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(f(message))
    }
}

impl MessageStore for InMemoryMessageStore {
    fn create(&self, message: ConversationMessage) -> MessageId {
        let id = message.id;
        let mut inner = self.inner.write();
        if inner.messages.insert(id, message).is_none() {
            inner.order.push(id);
        }
        id
    }

    fn get(&self, id: MessageId) -> Option<ConversationMessage> {
        self.inner.read().messages.get(&id).cloned()
    }

    fn list(&self) -> Vec<ConversationMessage> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.messages.get(id).cloned())
            .collect()
    }

    fn append_content(&self, id: MessageId, delta: &str) -> StoreResult<()> {
        self.with_message(id, |m| {
            m.content.push_str(delta);
            if m.role == MessageRole::Assistant {
                m.display_content.push_str(delta);
            }
        })
    }

    fn merge_metadata(&self, id: MessageId, patch: MessageMetadata) -> StoreResult<()> {
        self.with_message(id, |m| m.metadata.merge(patch))
    }

    fn set_status(&self, id: MessageId, status: MessageStatus) -> StoreResult<()> {
        self.with_message(id, |m| m.status = status)
    }

    fn update(&self, id: MessageId, edit: &mut dyn FnMut(&mut ConversationMessage)) -> StoreResult<()> {
        self.with_message(id, |m| edit(m))
    }

    fn delete(&self, id: MessageId) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.messages.remove(&id).is_some();
        if removed {
            inner.order.retain(|m| *m != id);
        }
        removed
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.messages.clear();
        inner.order.clear();
    }

    fn len(&self) -> usize {
        self.inner.read().order.len()
    }
}
