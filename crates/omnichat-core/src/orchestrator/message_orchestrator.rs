//! Send-message state machine
//!
//! ```text
//! Idle -> Preparing -> [ModelOverrideActive] -> Streaming -> Completed | Failed -> Idle
//! ```
//!
//! Cleanup (loading flag, override restore) runs on every path back to Idle.

use std::sync::Arc;

use parking_lot::RwLock;

use super::types::{ModelOverrideContext, OrchestratorStats, SendOptions, SendOutcome};
use crate::config::SettingsStore;
use crate::conversation::{ConversationState, MessageStore};
use crate::error::{ChatError, ChatResult};
use crate::logging::SharedLogger;
use crate::prompt::{BasicPromptFormatter, ContextItem, PromptFormatter};
use crate::providers::{ChatOptions, Provider};
use crate::registry::{ListenerId, ProviderRegistry, RegistryEvent, RegistryEventKind};
use crate::streaming::StreamingConsumer;
use crate::types::{
    CancellationToken, ConversationMessage, MessageId, MessageMetadata, MessageRole, MessageStatus,
};
use crate::{log_debug, log_info, log_warn};

/// Top-level entry point for one conversation
pub struct MessageOrchestrator {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn MessageStore>,
    settings: Arc<dyn SettingsStore>,
    formatter: Arc<dyn PromptFormatter>,
    state: ConversationState,
    consumer: StreamingConsumer,
    context_items: RwLock<Vec<ContextItem>>,
    provider_listener: ListenerId,
    logger: SharedLogger,
}

impl MessageOrchestrator {
    /// Create an orchestrator over a shared registry.
    ///
    /// Subscribes to active-provider changes so the continuity token is
    /// dropped whenever the provider type changes, however the change happens.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn MessageStore>,
        settings: Arc<dyn SettingsStore>,
        logger: SharedLogger,
    ) -> Self {
        let state = ConversationState::new();

        let listener_state = state.clone();
        let provider_listener = registry.on(
            RegistryEventKind::ActiveProviderChanged,
            move |event: &RegistryEvent| {
                if let RegistryEvent::ActiveProviderChanged { previous, current, .. } = event {
                    if previous != current {
                        listener_state.set_continuity_token(None);
                    }
                }
                Ok(())
            },
        );

        let consumer = StreamingConsumer::new(Arc::clone(&store), state.clone(), Arc::clone(&logger));

        Self {
            registry,
            store,
            settings,
            formatter: Arc::new(BasicPromptFormatter::new()),
            state,
            consumer,
            context_items: RwLock::new(Vec::new()),
            provider_listener,
            logger,
        }
    }

    /// Replace the prompt formatter used for first turns with context
    pub fn with_formatter(mut self, formatter: Arc<dyn PromptFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Send a message and stream the response into the conversation.
    ///
    /// Empty input is ignored. A send made while another is still running
    /// is rejected without touching conversation state. Other failures are
    /// recorded on the user message and in `last_error`, and also returned.
    pub async fn send_message(&self, text: &str, options: SendOptions) -> ChatResult<SendOutcome> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            log_debug!(self.logger, "[Orchestrator] Ignoring empty message");
            return Ok(SendOutcome::Ignored);
        }

        let Some(send) = self.state.try_begin_send(CancellationToken::new()) else {
            log_warn!(self.logger, "[Orchestrator] Rejecting send while another is in progress");
            return Err(if options.model_override.is_some() {
                ChatError::ProviderSwitchBlocked
            } else {
                ChatError::SendInProgress
            });
        };

        let mut user_message_id = None;
        let mut override_ctx = None;
        let result = self
            .run_send(
                text,
                trimmed,
                options,
                send.cancel_token().clone(),
                &mut user_message_id,
                &mut override_ctx,
            )
            .await;

        if let Err(err) = &result {
            self.record_failure(user_message_id, err);
        }

        if let Some(ctx) = override_ctx {
            self.restore_override(ctx).await;
        }
        drop(send);

        result
    }

    async fn run_send(
        &self,
        raw: &str,
        trimmed: &str,
        options: SendOptions,
        cancel_token: CancellationToken,
        user_message_id: &mut Option<MessageId>,
        override_ctx: &mut Option<ModelOverrideContext>,
    ) -> ChatResult<SendOutcome> {
        let provider = self.registry.get_active_provider().ok_or(ChatError::NoActiveProvider)?;
        ensure_streaming(provider.as_ref())?;

        let user_id = if options.skip_user_message {
            self.reuse_last_user_message(options.metadata.clone())?
        } else {
            self.create_user_message(raw, trimmed, &options)
        };
        *user_message_id = Some(user_id);

        let provider = match options.model_override.as_deref() {
            Some(requested) => {
                self.apply_model_override(requested, provider.provider_type(), override_ctx)
                    .await?;
                let provider = self.registry.get_active_provider().ok_or(ChatError::NoActiveProvider)?;
                ensure_streaming(provider.as_ref())?;
                provider
            }
            None => provider,
        };

        let model = self.model_for(provider.provider_type()).await;
        let placeholder = ConversationMessage::assistant_placeholder().with_metadata(MessageMetadata {
            model: model.clone(),
            provider_type: Some(provider.provider_type().to_string()),
            ..Default::default()
        });
        let assistant_id = self.store.create(placeholder);

        let mut chat_options = ChatOptions::new();
        chat_options.model = model;

        let outcome = self
            .consumer
            .consume(Arc::clone(&provider), assistant_id, cancel_token, chat_options)
            .await?;

        self.store.set_status(user_id, MessageStatus::Sent)?;

        Ok(SendOutcome::Completed {
            user_message_id: user_id,
            assistant_message_id: assistant_id,
            partial: outcome.interrupted,
        })
    }

    /// Build the user record. The first turn with loaded context sends the
    /// formatted prompt; the display text is always the original input.
    fn create_user_message(&self, raw: &str, trimmed: &str, options: &SendOptions) -> MessageId {
        let is_first_turn = self.store.count_role(MessageRole::User) == 0;
        let context = self.context_items.read().clone();

        let display = options.display_content.clone().unwrap_or_else(|| raw.to_string());
        let mut metadata = options.metadata.clone().unwrap_or_default();

        let mut content = trimmed.to_string();
        if is_first_turn && !context.is_empty() {
            let formatted = self.formatter.format(trimmed, &context);
            if !formatted.formatted_prompt_text.trim().is_empty() {
                content = formatted.formatted_prompt_text;
            }
            metadata.merge(MessageMetadata {
                has_tab_context: Some(true),
                truncated: formatted.metadata.truncated,
                truncated_count: formatted.metadata.truncated_count,
                ..Default::default()
            });
            log_debug!(
                self.logger,
                "[Orchestrator] First turn formatted with {} context items",
                context.len()
            );
        }

        self.store
            .create(ConversationMessage::user(content, display).with_metadata(metadata))
    }

    /// Reset the last user message and drop the replies that followed it
    fn reuse_last_user_message(&self, patch: Option<MessageMetadata>) -> ChatResult<MessageId> {
        let last = self
            .store
            .last_with_role(MessageRole::User)
            .ok_or(ChatError::NoUserMessage)?;

        let stale: Vec<MessageId> = self
            .store
            .list()
            .into_iter()
            .skip_while(|m| m.id != last.id)
            .skip(1)
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.id)
            .collect();
        for id in &stale {
            self.store.delete(*id);
        }

        let mut patch = patch;
        self.store.update(last.id, &mut |m| {
            m.status = MessageStatus::Pending;
            m.metadata.error = None;
            if let Some(p) = patch.take() {
                m.metadata.merge(p);
            }
        })?;

        log_debug!(
            self.logger,
            "[Orchestrator] Regenerating from {} ({} replies removed)",
            last.id,
            stale.len()
        );
        Ok(last.id)
    }

    /// Apply a per-send model override. Unavailable models are ignored.
    async fn apply_model_override(
        &self,
        requested: &str,
        active_type: &str,
        slot: &mut Option<ModelOverrideContext>,
    ) -> ChatResult<()> {
        let settings = self.settings.settings().await;
        let Some(model) = settings.model(requested) else {
            log_debug!(
                self.logger,
                "[Orchestrator] Override model '{}' is not available, keeping current model",
                requested
            );
            return Ok(());
        };

        let ctx = slot.insert(ModelOverrideContext {
            requested_model: requested.to_string(),
            original_model: settings.selected_model.clone(),
            original_provider_type: active_type.to_string(),
            switched_provider: false,
        });

        if model.provider_type != active_type {
            self.switch_provider(&model.provider_type)?;
            ctx.switched_provider = true;
        }
        self.settings
            .set_selected_model(Some(requested.to_string()))
            .await?;

        log_info!(
            self.logger,
            "[Orchestrator] Model override applied: {} ({})",
            requested,
            model.provider_type
        );
        Ok(())
    }

    /// Undo an override. Failures are logged, never returned.
    async fn restore_override(&self, ctx: ModelOverrideContext) {
        if let Err(e) = self.settings.set_selected_model(ctx.original_model.clone()).await {
            log_warn!(self.logger, "[Orchestrator] Failed to restore model: {}", e);
        }
        if ctx.switched_provider {
            if let Err(e) = self.switch_provider(&ctx.original_provider_type) {
                log_warn!(
                    self.logger,
                    "[Orchestrator] Failed to restore provider '{}': {}",
                    ctx.original_provider_type,
                    e
                );
            }
        }
        log_debug!(
            self.logger,
            "[Orchestrator] Model override for '{}' restored",
            ctx.requested_model
        );
    }

    fn record_failure(&self, user_message_id: Option<MessageId>, err: &ChatError) {
        let message = err.to_string();
        log_warn!(self.logger, "[Orchestrator] Send failed ({}): {}", err.code(), message);
        self.state.set_error(message.clone());

        if let Some(id) = user_message_id {
            let marked = self.store.set_status(id, MessageStatus::Error).and_then(|_| {
                self.store.merge_metadata(
                    id,
                    MessageMetadata {
                        error: Some(message),
                        ..Default::default()
                    },
                )
            });
            if let Err(e) = marked {
                log_warn!(self.logger, "[Orchestrator] Could not mark user message failed: {}", e);
            }
        }
    }

    /// The selected model, when it belongs to `provider_type`
    async fn model_for(&self, provider_type: &str) -> Option<String> {
        let settings = self.settings.settings().await;
        match settings.selected_model_info() {
            Some(info) if info.provider_type == provider_type => Some(info.id.clone()),
            Some(_) => None,
            // Selected but not in the catalog: pass through as-is
            None => settings.selected_model.clone(),
        }
    }

    /// Signal the in-flight send to stop. Idempotent.
    ///
    /// Takes effect from the moment a send starts, so a cancel issued while
    /// the send is still preparing stops it before any stream opens.
    pub fn cancel_message(&self) -> bool {
        let cancelled = self.state.cancel_stream();
        if cancelled {
            log_info!(self.logger, "[Orchestrator] Cancellation requested");
        }
        cancelled
    }

    /// Make `provider_type` active.
    ///
    /// Rejected without side effects while a stream is in flight; a no-op if
    /// it is already active.
    pub fn switch_provider(&self, provider_type: &str) -> ChatResult<()> {
        if self.state.is_streaming() {
            log_warn!(
                self.logger,
                "[Orchestrator] Refusing to switch to '{}' while streaming",
                provider_type
            );
            return Err(ChatError::ProviderSwitchBlocked);
        }
        if self.registry.get_active_provider_type().as_deref() == Some(provider_type) {
            return Ok(());
        }

        self.registry.set_active_provider(provider_type)?;
        Ok(())
    }

    /// Persist a model selection, switching provider if the model belongs
    /// to another one
    pub async fn select_model(&self, model_id: &str) -> ChatResult<()> {
        let settings = self.settings.settings().await;
        let model = settings
            .model(model_id)
            .cloned()
            .ok_or_else(|| ChatError::ModelUnavailable(model_id.to_string()))?;

        self.switch_provider(&model.provider_type)?;
        self.settings.set_selected_model(Some(model.id.clone())).await?;
        self.settings
            .set_default_provider(Some(model.provider_type.clone()))
            .await?;

        log_info!(
            self.logger,
            "[Orchestrator] Selected model {} ({})",
            model.id,
            model.provider_type
        );
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming()
    }

    pub fn get_stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            active_provider_type: self.registry.get_active_provider_type(),
            registered_provider_types: self.registry.get_registered_providers(),
            message_count: self.store.len(),
            is_streaming: self.state.is_streaming(),
        }
    }

    pub fn continuity_token(&self) -> Option<String> {
        self.state.continuity_token()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.last_error()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Context used to format the first user turn
    pub fn set_context_items(&self, items: Vec<ContextItem>) {
        *self.context_items.write() = items;
    }

    pub fn context_items(&self) -> Vec<ContextItem> {
        self.context_items.read().clone()
    }

    /// Stop any stream and forget the log, the error and the continuity token
    pub fn clear_conversation(&self) {
        self.state.cancel_stream();
        self.store.clear();
        self.state.set_continuity_token(None);
        self.state.clear_error();
        log_info!(self.logger, "[Orchestrator] Conversation cleared");
    }

    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.store.list()
    }

    /// Shared view of the conversation state
    pub fn state(&self) -> ConversationState {
        self.state.clone()
    }
}

impl Drop for MessageOrchestrator {
    fn drop(&mut self) {
        self.registry
            .off(RegistryEventKind::ActiveProviderChanged, self.provider_listener);
    }
}

impl std::fmt::Debug for MessageOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageOrchestrator")
            .field("active_provider", &self.registry.get_active_provider_type())
            .field("messages", &self.store.len())
            .field("streaming", &self.state.is_streaming())
            .finish()
    }
}

fn ensure_streaming(provider: &dyn Provider) -> ChatResult<()> {
    if provider.supports_streaming() {
        Ok(())
    } else {
        Err(ChatError::StreamCapability {
            provider_type: provider.provider_type().to_string(),
        })
    }
}
