//! Shared per-conversation state observed by the orchestrator, the
//! streaming consumer and the host UI

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{CancellationToken, MessageId};

#[derive(Debug, Default)]
struct StateInner {
    active_message: Option<MessageId>,
    cancel_token: Option<CancellationToken>,
    continuity_token: Option<String>,
    loading: bool,
    last_error: Option<String>,
}

/// Mutable state of one conversation.
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    inner: Arc<Mutex<StateInner>>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message currently receiving streamed content
    pub fn active_message(&self) -> Option<MessageId> {
        self.inner.lock().active_message
    }

    /// Whether a stream is in flight
    pub fn is_streaming(&self) -> bool {
        self.inner.lock().active_message.is_some()
    }

    /// Mark `id` as the active message and remember the stream's token.
    ///
    /// The returned guard clears both when dropped, on every exit path.
    pub fn begin_stream(&self, id: MessageId, cancel_token: CancellationToken) -> ActiveMessageGuard {
        let mut inner = self.inner.lock();
        inner.active_message = Some(id);
        inner.cancel_token = Some(cancel_token);
        ActiveMessageGuard {
            state: self.clone(),
            id,
        }
    }

    /// Clear the active message only if it is still `id`
    pub fn clear_active_message_if(&self, id: MessageId) -> bool {
        let mut inner = self.inner.lock();
        if inner.active_message == Some(id) {
            inner.active_message = None;
            inner.cancel_token = None;
            true
        } else {
            false
        }
    }

    /// Signal the in-flight send's token, if any. Idempotent.
    pub fn cancel_stream(&self) -> bool {
        match self.inner.lock().cancel_token.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn continuity_token(&self) -> Option<String> {
        self.inner.lock().continuity_token.clone()
    }

    pub fn set_continuity_token(&self, token: Option<String>) {
        self.inner.lock().continuity_token = token;
    }

    /// Whether a send owns the conversation
    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    /// Claim the conversation for one send: clear the stale error, raise the
    /// loading flag and register `cancel_token` so a cancel issued before
    /// the stream opens is not lost.
    ///
    /// Returns `None`, touching nothing, while another send or stream holds
    /// the conversation.
    pub fn try_begin_send(&self, cancel_token: CancellationToken) -> Option<SendGuard> {
        let mut inner = self.inner.lock();
        if inner.loading || inner.active_message.is_some() {
            return None;
        }
        inner.loading = true;
        inner.last_error = None;
        inner.cancel_token = Some(cancel_token.clone());
        Some(SendGuard {
            state: self.clone(),
            cancel_token,
        })
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().last_error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.inner.lock().last_error = None;
    }
}

/// Clears the active-message pointer when dropped
#[must_use = "the active message is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ActiveMessageGuard {
    state: ConversationState,
    id: MessageId,
}

impl ActiveMessageGuard {
    pub fn message_id(&self) -> MessageId {
        self.id
    }
}

impl Drop for ActiveMessageGuard {
    fn drop(&mut self) {
        self.state.clear_active_message_if(self.id);
    }
}

/// Releases a send's claim on the conversation when dropped
#[must_use = "the send slot is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SendGuard {
    state: ConversationState,
    cancel_token: CancellationToken,
}

impl SendGuard {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock();
        inner.loading = false;
        if inner
            .cancel_token
            .as_ref()
            .is_some_and(|t| t.same_as(&self.cancel_token))
        {
            inner.cancel_token = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_active_message() {
        let state = ConversationState::new();
        let id = MessageId::new();
        {
            let _guard = state.begin_stream(id, CancellationToken::new());
            assert!(state.is_streaming());
            assert_eq!(state.active_message(), Some(id));
        }
        assert!(!state.is_streaming());
        assert!(!state.cancel_stream());
    }

    #[test]
    fn test_guard_does_not_clear_newer_stream() {
        let state = ConversationState::new();
        let first = MessageId::new();
        let second = MessageId::new();

        let guard = state.begin_stream(first, CancellationToken::new());
        let _second_guard = state.begin_stream(second, CancellationToken::new());
        drop(guard);

        assert_eq!(state.active_message(), Some(second));
    }

    #[test]
    fn test_cancel_stream_signals_token() {
        let state = ConversationState::new();
        let token = CancellationToken::new();
        let _guard = state.begin_stream(MessageId::new(), token.clone());

        assert!(state.cancel_stream());
        assert!(state.cancel_stream());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let state = ConversationState::new();
        let view = state.clone();
        state.set_continuity_token(Some("resp_1".into()));
        state.set_error("boom");

        assert_eq!(view.continuity_token().as_deref(), Some("resp_1"));
        assert_eq!(view.last_error().as_deref(), Some("boom"));

        view.clear_error();
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_send_slot_is_exclusive() {
        let state = ConversationState::new();
        state.set_error("stale");

        let guard = state.try_begin_send(CancellationToken::new()).unwrap();
        assert!(state.is_loading());
        assert!(state.last_error().is_none());

        state.set_error("first send failed");
        assert!(state.try_begin_send(CancellationToken::new()).is_none());
        assert!(state.is_loading());
        assert_eq!(state.last_error().as_deref(), Some("first send failed"));

        drop(guard);
        assert!(!state.is_loading());
        assert!(state.try_begin_send(CancellationToken::new()).is_some());
    }

    #[test]
    fn test_send_slot_rejected_while_streaming() {
        let state = ConversationState::new();
        let _stream = state.begin_stream(MessageId::new(), CancellationToken::new());

        assert!(state.try_begin_send(CancellationToken::new()).is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_cancel_reaches_send_before_stream_opens() {
        let state = ConversationState::new();
        let guard = state.try_begin_send(CancellationToken::new()).unwrap();

        assert!(!state.is_streaming());
        assert!(state.cancel_stream());
        assert!(guard.cancel_token().is_cancelled());

        drop(guard);
        assert!(!state.cancel_stream());
    }
}
