//! End-to-end conversation scenarios against mock providers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use omnichat_core::config::{
    ConfigResult, FileSettingsStore, MemorySettingsStore, Settings, SettingsStore,
};
use omnichat_core::logging::{MemoryLogger, NoOpLogger, TracingLogger};
use omnichat_core::providers::{MockProvider, MockStep};
use omnichat_core::{
    bootstrap_providers, CancellationToken, CapabilityFlag, ChatError, DefaultProviderFactory,
    InMemoryMessageStore, MemorySecretStore, MessageOrchestrator, MessageStatus, ModelInfo,
    ProviderCapabilities, ProviderConfig, ProviderRegistry, RegistryError, SendOptions, SendOutcome,
    SharedLogger, StreamChunk,
};

fn logger() -> SharedLogger {
    NoOpLogger::shared()
}

struct Fixture {
    registry: Arc<ProviderRegistry>,
    settings: Arc<MemorySettingsStore>,
    orchestrator: MessageOrchestrator,
}

/// Registers the providers in order and activates the first
fn fixture(providers: Vec<MockProvider>, settings: Settings) -> Fixture {
    let registry = Arc::new(ProviderRegistry::new(logger()));
    for provider in providers {
        registry.register(Arc::new(provider)).unwrap();
    }
    if let Some(first) = registry.get_registered_providers().first() {
        registry.set_active_provider(first).unwrap();
    }

    let settings = Arc::new(MemorySettingsStore::with_settings(settings));
    let orchestrator = MessageOrchestrator::new(
        Arc::clone(&registry),
        Arc::new(InMemoryMessageStore::new()),
        settings.clone(),
        logger(),
    );
    Fixture {
        registry,
        settings,
        orchestrator,
    }
}

fn two_provider_settings() -> Settings {
    Settings {
        available_models: vec![
            ModelInfo::new("mock-echo", "mock"),
            ModelInfo::new("mock-fixed", "mock"),
            ModelInfo::new("gpt-4o", "openai"),
        ],
        selected_model: Some("mock-echo".into()),
        ..Default::default()
    }
}

async fn wait_until_streaming(orchestrator: &MessageOrchestrator) {
    while !orchestrator.is_streaming() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn empty_registry_has_no_active_provider() {
    let f = fixture(vec![], Settings::default());

    assert!(f.registry.get_active_provider().is_none());
    let err = f
        .orchestrator
        .send_message("Hello", SendOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NoActiveProvider));
    assert!(f.orchestrator.last_error().is_some());
}

#[tokio::test]
async fn whitespace_input_is_a_no_op() {
    let f = fixture(vec![MockProvider::echo(logger())], Settings::default());

    for text in ["", "   "] {
        let outcome = f.orchestrator.send_message(text, SendOptions::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored);
    }

    assert!(f.orchestrator.messages().is_empty());
    assert!(f.orchestrator.last_error().is_none());
    assert!(!f.orchestrator.is_loading());
    assert!(f.orchestrator.continuity_token().is_none());
}

#[tokio::test]
async fn two_chunks_become_one_reply() {
    let f = fixture(vec![MockProvider::chunked(&["Hi", " there"], logger())], Settings::default());

    f.orchestrator.send_message("Hello", SendOptions::new()).await.unwrap();

    let reply = &f.orchestrator.messages()[1];
    assert_eq!(reply.content, "Hi there");
    assert_eq!(reply.status, MessageStatus::Received);
    assert!(!reply.metadata.is_partial());
}

#[tokio::test]
async fn failure_after_first_chunk_keeps_partial_reply() {
    let provider = MockProvider::scripted(
        vec![MockStep::content("Hi"), MockStep::Fail("socket hang up".into())],
        logger(),
    );
    let f = fixture(vec![provider], Settings::default());

    let outcome = f.orchestrator.send_message("Hello", SendOptions::new()).await.unwrap();
    assert!(matches!(outcome, SendOutcome::Completed { partial: true, .. }));

    let messages = f.orchestrator.messages();
    assert_eq!(messages[0].status, MessageStatus::Sent);
    let reply = &messages[1];
    assert!(reply.content.starts_with("Hi\n\n"));
    assert!(reply.content.contains("Response interrupted"));
    assert_eq!(reply.status, MessageStatus::Received);
    assert_eq!(reply.metadata.partial, Some(true));
}

#[tokio::test]
async fn cancel_after_content_keeps_partial_reply() {
    let provider = MockProvider::scripted(vec![MockStep::content("Hel"), MockStep::Hang], logger());
    let f = fixture(vec![provider], Settings::default());
    let orch = &f.orchestrator;

    let (result, cancelled) = tokio::join!(orch.send_message("Hello", SendOptions::new()), async {
        wait_until_streaming(orch).await;
        while orch.messages().get(1).map_or(true, |m| m.content.is_empty()) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let first = orch.cancel_message();
        let second = orch.cancel_message();
        (first, second)
    });

    assert_eq!(cancelled, (true, true));
    assert!(matches!(result.unwrap(), SendOutcome::Completed { partial: true, .. }));

    let reply = &orch.messages()[1];
    assert_eq!(reply.content, "Hel");
    assert_eq!(reply.status, MessageStatus::Received);
    assert_eq!(reply.metadata.partial, Some(true));
    assert_eq!(reply.metadata.interrupted, Some(true));
    assert!(!orch.is_streaming());
    assert!(!orch.is_loading());
}

#[tokio::test]
async fn cancel_before_content_removes_placeholder() {
    let provider = MockProvider::scripted(vec![MockStep::Hang], logger());
    let f = fixture(vec![provider], Settings::default());
    let orch = &f.orchestrator;

    let (result, _) = tokio::join!(orch.send_message("Hello", SendOptions::new()), async {
        wait_until_streaming(orch).await;
        orch.cancel_message()
    });

    assert!(matches!(result, Err(ChatError::InterruptedStream(_))));
    let messages = orch.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, MessageStatus::Error);
    assert!(!orch.is_streaming());
}

#[tokio::test]
async fn continuity_token_follows_provider_type() {
    let provider = MockProvider::scripted(
        vec![
            MockStep::content("answer"),
            MockStep::Chunk(StreamChunk::response_id("resp_1")),
        ],
        logger(),
    );
    let requests = provider.requests();
    let f = fixture(
        vec![provider, MockProvider::echo(logger()).with_type("openai")],
        two_provider_settings(),
    );
    let orch = &f.orchestrator;

    orch.send_message("first", SendOptions::new()).await.unwrap();
    assert_eq!(orch.continuity_token().as_deref(), Some("resp_1"));

    // Same provider, different model
    orch.select_model("mock-fixed").await.unwrap();
    assert_eq!(orch.continuity_token().as_deref(), Some("resp_1"));

    orch.send_message("second", SendOptions::new()).await.unwrap();
    {
        let recorded = requests.lock();
        assert_eq!(recorded[1].options.previous_response_id.as_deref(), Some("resp_1"));
        assert_eq!(recorded[1].options.model.as_deref(), Some("mock-fixed"));
    }

    orch.switch_provider("openai").unwrap();
    assert!(orch.continuity_token().is_none());
}

#[tokio::test]
async fn override_switch_is_rejected_while_streaming() {
    let long_running = MockProvider::scripted(vec![MockStep::content("partial"), MockStep::Hang], logger());
    let f = fixture(
        vec![long_running, MockProvider::echo(logger()).with_type("openai")],
        two_provider_settings(),
    );
    let orch = &f.orchestrator;

    let (first, second) = tokio::join!(orch.send_message("long", SendOptions::new()), async {
        wait_until_streaming(orch).await;
        let blocked = orch
            .send_message("other", SendOptions::new().with_model_override("gpt-4o"))
            .await;

        // The rejected send leaves the running one untouched
        assert!(orch.is_streaming());
        assert!(orch.is_loading());
        assert!(orch.last_error().is_none());
        let log: Vec<_> = orch.messages().into_iter().map(|m| m.display_content).collect();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "long");

        let direct = orch.switch_provider("openai");
        orch.cancel_message();
        (blocked, direct)
    });

    let (blocked, direct) = second;
    assert!(matches!(blocked, Err(ChatError::ProviderSwitchBlocked)));
    assert!(matches!(direct, Err(ChatError::ProviderSwitchBlocked)));
    assert!(first.is_ok());
    assert!(!orch.is_loading());

    assert_eq!(f.registry.get_active_provider_type().as_deref(), Some("mock"));
    let settings = f.settings.settings().await;
    assert_eq!(settings.selected_model.as_deref(), Some("mock-echo"));
}

#[tokio::test]
async fn override_is_restored_after_success() {
    let openai = MockProvider::fixed("from openai", logger()).with_type("openai");
    let openai_requests = openai.requests();
    let f = fixture(vec![MockProvider::echo(logger()), openai], two_provider_settings());

    f.orchestrator
        .send_message("hi", SendOptions::new().with_model_override("gpt-4o"))
        .await
        .unwrap();

    let reply = &f.orchestrator.messages()[1];
    assert_eq!(reply.content, "from openai");
    assert_eq!(reply.metadata.provider_type.as_deref(), Some("openai"));
    assert_eq!(reply.metadata.model.as_deref(), Some("gpt-4o"));
    assert_eq!(openai_requests.lock()[0].options.model.as_deref(), Some("gpt-4o"));

    assert_eq!(f.registry.get_active_provider_type().as_deref(), Some("mock"));
    let settings = f.settings.settings().await;
    assert_eq!(settings.selected_model.as_deref(), Some("mock-echo"));
}

#[tokio::test]
async fn override_is_restored_after_failure() {
    let failing = MockProvider::error("invalid request", logger()).with_type("openai");
    let f = fixture(vec![MockProvider::echo(logger()), failing], two_provider_settings());

    let err = f
        .orchestrator
        .send_message("hi", SendOptions::new().with_model_override("gpt-4o"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Provider(_)));

    assert_eq!(f.registry.get_active_provider_type().as_deref(), Some("mock"));
    let settings = f.settings.settings().await;
    assert_eq!(settings.selected_model.as_deref(), Some("mock-echo"));
    assert_eq!(f.orchestrator.messages()[0].status, MessageStatus::Error);
}

#[tokio::test]
async fn unavailable_override_is_ignored() {
    let f = fixture(vec![MockProvider::echo(logger())], two_provider_settings());

    f.orchestrator
        .send_message("hi", SendOptions::new().with_model_override("not-a-model"))
        .await
        .unwrap();

    let reply = &f.orchestrator.messages()[1];
    assert_eq!(reply.content, "Echo: hi");
    assert_eq!(reply.metadata.model.as_deref(), Some("mock-echo"));
}

#[tokio::test]
async fn capabilities_without_thinking_are_rejected() {
    let registry = ProviderRegistry::new(logger());
    let provider = MockProvider::echo(logger())
        .with_capabilities(ProviderCapabilities::full(32_000).without_flag(CapabilityFlag::Thinking));

    let err = registry.register(Arc::new(provider)).unwrap_err();
    match err {
        RegistryError::InvalidProvider { reason, .. } => assert!(reason.contains("thinking")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(registry.get_registered_providers().is_empty());
}

#[tokio::test]
async fn unregistering_active_provider_clears_it() {
    let f = fixture(
        vec![MockProvider::echo(logger()), MockProvider::echo(logger()).with_type("openai")],
        Settings::default(),
    );

    assert!(f.registry.unregister("mock"));
    assert!(f.registry.get_active_provider_type().is_none());
    assert_eq!(f.orchestrator.get_stats().registered_provider_types, vec!["openai".to_string()]);

    let err = f.orchestrator.send_message("hi", SendOptions::new()).await.unwrap_err();
    assert!(matches!(err, ChatError::NoActiveProvider));
}

#[tokio::test]
async fn settings_file_to_first_reply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    std::fs::write(
        &path,
        "defaultProviderType: mock\nproviders:\n  - providerType: mock\n    models: [mock-echo]\n",
    )
    .unwrap();

    let log = Arc::new(MemoryLogger::new());
    let shared: SharedLogger = log.clone();
    let settings = Arc::new(FileSettingsStore::new(&path));
    let registry = Arc::new(ProviderRegistry::new(shared.clone()));

    let report = bootstrap_providers(
        &registry,
        &DefaultProviderFactory::new(Arc::new(TracingLogger::new())),
        settings.as_ref(),
        &MemorySecretStore::new(),
        &shared,
    )
    .await;
    assert_eq!(report.active.as_deref(), Some("mock"));

    let orchestrator = MessageOrchestrator::new(
        registry,
        Arc::new(InMemoryMessageStore::new()),
        settings,
        shared,
    );
    orchestrator.send_message("ping", SendOptions::new()).await.unwrap();

    assert_eq!(orchestrator.messages()[1].content, "Echo: ping");
    assert!(log.contains("[Bootstrap]"));
    assert_eq!(orchestrator.get_stats().message_count, 2);
}

/// Settings store whose reads park until `release` is called
struct GatedSettings {
    inner: MemorySettingsStore,
    entered: AtomicBool,
    released: AtomicBool,
    gate: Notify,
}

impl GatedSettings {
    fn new(settings: Settings) -> Self {
        Self {
            inner: MemorySettingsStore::with_settings(settings),
            entered: AtomicBool::new(false),
            released: AtomicBool::new(false),
            gate: Notify::new(),
        }
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.gate.notify_one();
    }
}

#[async_trait]
impl SettingsStore for GatedSettings {
    async fn settings(&self) -> Settings {
        if !self.released.load(Ordering::SeqCst) {
            self.entered.store(true, Ordering::SeqCst);
            self.gate.notified().await;
        }
        self.inner.settings().await
    }

    async fn set_selected_model(&self, model_id: Option<String>) -> ConfigResult<()> {
        self.inner.set_selected_model(model_id).await
    }

    async fn set_default_provider(&self, provider_type: Option<String>) -> ConfigResult<()> {
        self.inner.set_default_provider(provider_type).await
    }

    async fn set_available_models(&self, models: Vec<ModelInfo>) -> ConfigResult<()> {
        self.inner.set_available_models(models).await
    }

    async fn upsert_provider(&self, config: ProviderConfig) -> ConfigResult<()> {
        self.inner.upsert_provider(config).await
    }

    async fn remove_provider(&self, provider_type: &str) -> ConfigResult<()> {
        self.inner.remove_provider(provider_type).await
    }
}

#[tokio::test]
async fn cancel_while_preparing_stops_the_send() {
    let provider = MockProvider::chunked(&["never"], logger());
    let requests = provider.requests();
    let registry = Arc::new(ProviderRegistry::new(logger()));
    registry.register(Arc::new(provider)).unwrap();
    registry.set_active_provider("mock").unwrap();
    let settings = Arc::new(GatedSettings::new(Settings::default()));
    let orch = MessageOrchestrator::new(
        registry,
        Arc::new(InMemoryMessageStore::new()),
        settings.clone(),
        logger(),
    );

    let (result, cancelled) = tokio::join!(orch.send_message("Hello", SendOptions::new()), async {
        while !settings.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(orch.is_loading());
        assert!(!orch.is_streaming());
        let cancelled = orch.cancel_message();
        settings.release();
        cancelled
    });

    assert!(cancelled);
    assert!(matches!(result, Err(ChatError::InterruptedStream(_))));
    assert!(requests.lock().is_empty());

    let messages = orch.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, MessageStatus::Error);
    assert!(!orch.is_loading());
    assert!(!orch.cancel_message());
}

#[tokio::test]
async fn second_send_while_streaming_is_rejected() {
    let provider = MockProvider::scripted(vec![MockStep::content("partial"), MockStep::Hang], logger());
    let f = fixture(vec![provider], Settings::default());
    let orch = &f.orchestrator;

    let (first, second) = tokio::join!(orch.send_message("long", SendOptions::new()), async {
        wait_until_streaming(orch).await;
        let second = orch.send_message("again", SendOptions::new()).await;
        assert!(orch.is_loading());
        assert!(orch.last_error().is_none());
        orch.cancel_message();
        second
    });

    assert!(matches!(second, Err(ChatError::SendInProgress)));
    assert!(first.is_ok());
    assert_eq!(orch.messages().len(), 2);
    assert!(!orch.is_loading());

    // The conversation is free again once the first send finishes
    assert!(orch.state().try_begin_send(CancellationToken::new()).is_some());
}
