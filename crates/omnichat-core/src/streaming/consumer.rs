//! Folds one provider stream into an assistant message
//!
//! The consumer only holds the message id; every write goes through the
//! message store, so cancellation and observers see the same record.

use std::sync::Arc;

use futures::StreamExt;

use crate::conversation::{ConversationState, MessageStore};
use crate::error::{ChatError, ChatResult};
use crate::logging::SharedLogger;
use crate::providers::{is_network_like_message, ChatOptions, Provider, ProviderError};
use crate::types::{
    CancellationToken, ChatMessage, MessageId, MessageMetadata, MessageRole, MessageStatus,
    SearchResult, StreamChunk,
};
use crate::{log_debug, log_info, log_warn};

/// Used when a stream stops before any content with no failure to report
pub const EMPTY_INTERRUPTION_MESSAGE: &str = "stream interrupted before receiving any content";

/// Notice appended to partial content when the stream fails mid-way
pub fn interruption_notice(reason: &str) -> String {
    format!("\n\n_[Response interrupted: {}]_", reason)
}

/// What a finished stream produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub content: String,
    pub thinking: String,
    pub response_id: Option<String>,
    pub search_results: Option<Vec<SearchResult>>,
    /// Cancelled or failed after some content arrived
    pub interrupted: bool,
    pub chunk_count: usize,
}

#[derive(Default)]
struct Accumulator {
    content: String,
    thinking: String,
    thinking_done: bool,
    response_id: Option<String>,
    search_results: Option<Vec<SearchResult>>,
    chunk_count: usize,
}

impl Accumulator {
    fn into_outcome(self, interrupted: bool) -> StreamOutcome {
        StreamOutcome {
            content: self.content,
            thinking: self.thinking,
            response_id: self.response_id,
            search_results: self.search_results,
            interrupted,
            chunk_count: self.chunk_count,
        }
    }
}

/// Drives one response stream into the conversation log
#[derive(Clone)]
pub struct StreamingConsumer {
    store: Arc<dyn MessageStore>,
    state: ConversationState,
    logger: SharedLogger,
}

impl StreamingConsumer {
    pub fn new(store: Arc<dyn MessageStore>, state: ConversationState, logger: SharedLogger) -> Self {
        Self { store, state, logger }
    }

    /// Stream a response from `provider` into the placeholder `assistant_id`.
    ///
    /// On success the placeholder ends `Received`, possibly flagged partial.
    /// On failure with no content the placeholder is deleted. The active
    /// message pointer is cleared on every path.
    pub async fn consume(
        &self,
        provider: Arc<dyn Provider>,
        assistant_id: MessageId,
        cancel_token: CancellationToken,
        mut options: ChatOptions,
    ) -> ChatResult<StreamOutcome> {
        let provider_type = provider.provider_type().to_string();

        if !provider.supports_streaming() {
            self.store.delete(assistant_id);
            return Err(ChatError::StreamCapability { provider_type });
        }

        let _guard = self.state.begin_stream(assistant_id, cancel_token.clone());

        if cancel_token.is_cancelled() {
            self.store.delete(assistant_id);
            log_info!(self.logger, "Cancelled before the {} stream opened", provider_type);
            return Err(ChatError::InterruptedStream(EMPTY_INTERRUPTION_MESSAGE.to_string()));
        }

        let messages = self.outbound_messages(assistant_id);
        if messages.is_empty() {
            self.store.delete(assistant_id);
            return Err(ChatError::NoValidMessages);
        }

        if options.previous_response_id.is_none() {
            options.previous_response_id = self.state.continuity_token();
        }

        log_info!(
            self.logger,
            "Streaming from {} with {} messages (continuity: {})",
            provider_type,
            messages.len(),
            options.previous_response_id.is_some()
        );

        let mut stream = match provider.stream_chat(messages, options, cancel_token.clone()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.store.delete(assistant_id);
                log_warn!(self.logger, "{} failed to open stream: {}", provider_type, e);
                return Err(classify_open_failure(provider.as_ref(), &e));
            }
        };

        let mut acc = Accumulator::default();
        let mut failure: Option<ProviderError> = None;
        let mut interrupted = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    interrupted = true;
                    break;
                }
                item = stream.next() => item,
            };

            let Some(item) = next else { break };

            if cancel_token.is_cancelled() {
                interrupted = true;
                break;
            }

            match item {
                Ok(chunk) => {
                    if let Err(e) = self.apply_chunk(assistant_id, chunk, &mut acc) {
                        if acc.content.is_empty() {
                            self.store.delete(assistant_id);
                            return Err(e);
                        }
                        log_warn!(
                            self.logger,
                            "{} stream stopped on a store failure, keeping partial content: {}",
                            provider_type,
                            e
                        );
                        interrupted = true;
                        break;
                    }
                }
                Err(e) => {
                    interrupted = true;
                    failure = Some(e);
                    break;
                }
            }
        }

        // Release the provider's stream before touching the record again
        drop(stream);

        if interrupted && acc.content.is_empty() {
            self.store.delete(assistant_id);
            let err = match &failure {
                Some(e) => classify_stream_failure(provider.as_ref(), e),
                None => ChatError::InterruptedStream(EMPTY_INTERRUPTION_MESSAGE.to_string()),
            };
            log_warn!(
                self.logger,
                "{} stream interrupted before any content: {}",
                provider_type,
                err
            );
            return Err(err);
        }

        if let Some(e) = &failure {
            let reason = provider.format_error(e).message;
            let notice = interruption_notice(&reason);
            self.store.append_content(assistant_id, &notice)?;
            log_warn!(
                self.logger,
                "{} stream failed after {} chunks, keeping partial content: {}",
                provider_type,
                acc.chunk_count,
                reason
            );
        }

        let mut finale = MessageMetadata {
            thinking_streaming: Some(false),
            thinking: (!acc.thinking.is_empty()).then(|| acc.thinking.clone()),
            search_results: acc.search_results.clone(),
            ..Default::default()
        };
        if interrupted {
            finale.partial = Some(true);
            finale.interrupted = Some(true);
        }
        self.store.merge_metadata(assistant_id, finale)?;
        self.store.set_status(assistant_id, MessageStatus::Received)?;

        if !interrupted {
            if let Some(response_id) = &acc.response_id {
                self.state.set_continuity_token(Some(response_id.clone()));
            }
        }

        log_debug!(
            self.logger,
            "{} stream finished: {} chunks, {} chars, interrupted={}",
            provider_type,
            acc.chunk_count,
            acc.content.len(),
            interrupted
        );

        Ok(acc.into_outcome(interrupted))
    }

    /// The first user turn sends only that message; later turns send the
    /// whole non-empty history minus the placeholder.
    fn outbound_messages(&self, assistant_id: MessageId) -> Vec<ChatMessage> {
        let history = self.store.list();
        let user_turns: Vec<_> = history.iter().filter(|m| m.role == MessageRole::User).collect();

        if let [only] = user_turns.as_slice() {
            return if only.is_empty() {
                Vec::new()
            } else {
                vec![only.to_chat_message()]
            };
        }

        history
            .iter()
            .filter(|m| m.id != assistant_id && !m.is_empty())
            .map(|m| m.to_chat_message())
            .collect()
    }

    fn apply_chunk(&self, id: MessageId, chunk: StreamChunk, acc: &mut Accumulator) -> ChatResult<()> {
        acc.chunk_count += 1;

        if let Some(delta) = chunk.thinking_delta.filter(|d| !d.is_empty()) {
            acc.thinking.push_str(&delta);
            self.store.merge_metadata(
                id,
                MessageMetadata {
                    thinking: Some(acc.thinking.clone()),
                    thinking_streaming: Some(!acc.thinking_done),
                    ..Default::default()
                },
            )?;
        }

        if let Some(delta) = chunk.content_delta.filter(|d| !d.is_empty()) {
            if !acc.thinking.is_empty() && !acc.thinking_done {
                acc.thinking_done = true;
                self.store.merge_metadata(
                    id,
                    MessageMetadata {
                        thinking_streaming: Some(false),
                        ..Default::default()
                    },
                )?;
            }
            self.store.append_content(id, &delta)?;
            acc.content.push_str(&delta);
        }

        if chunk.response_id.is_some() || chunk.search_results.is_some() {
            if chunk.response_id.is_some() {
                acc.response_id = chunk.response_id.clone();
            }
            if chunk.search_results.is_some() {
                acc.search_results = chunk.search_results.clone();
            }
            self.store.merge_metadata(
                id,
                MessageMetadata {
                    response_id: chunk.response_id,
                    search_results: chunk.search_results,
                    ..Default::default()
                },
            )?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for StreamingConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingConsumer")
            .field("active_message", &self.state.active_message())
            .finish()
    }
}

fn is_network_like(provider: &dyn Provider, error: &ProviderError) -> (bool, String) {
    let message = provider.format_error(error).message;
    (error.is_network_like() || is_network_like_message(&message), message)
}

fn classify_open_failure(provider: &dyn Provider, error: &ProviderError) -> ChatError {
    match is_network_like(provider, error) {
        (true, message) => ChatError::NetworkLike { message },
        (false, _) => ChatError::Provider(provider.format_error(error)),
    }
}

fn classify_stream_failure(provider: &dyn Provider, error: &ProviderError) -> ChatError {
    match is_network_like(provider, error) {
        (true, message) => ChatError::NetworkLike { message },
        (false, message) => ChatError::StreamFailure(message),
    }
}
