//! Mock provider for testing
//!
//! Provides deterministic, scriptable responses without network dependencies.
//! Scripts can interleave content, thinking, response ids and search results,
//! fail mid-stream, trigger the cancellation token between chunks, or hang
//! until cancelled.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatOptions, ChatResponse, Provider, StreamResponse};
use crate::logging::SharedLogger;
use crate::types::{
    CancellationToken, ChatMessage, ConfigValidation, MessageRole, ModelInfo,
    ProviderCapabilities, ProviderConfig, StreamChunk,
};

/// One scripted stream step
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Yield a chunk
    Chunk(StreamChunk),
    /// Yield a stream-level failure
    Fail(String),
    /// Signal the request's cancellation token (simulates a user pressing stop)
    Cancel,
    /// Never yield again until the consumer gives up
    Hang,
    /// Sleep before the next step
    Delay(u64),
}

impl MockStep {
    pub fn content(text: impl Into<String>) -> Self {
        MockStep::Chunk(StreamChunk::content(text))
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        MockStep::Chunk(StreamChunk::thinking(text))
    }
}

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response split into chunks
    Fixed(String),
    /// Play a script step by step
    Script(Vec<MockStep>),
    /// Fail when opening the stream
    OpenError(String),
    /// Return nothing (empty response)
    Empty,
}

/// Configuration for the mock provider
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Response mode
    pub mode: MockMode,
    /// Delay between chunks in milliseconds (0 = no delay)
    pub chunk_delay_ms: u64,
    /// Size of each chunk when splitting fixed/echo responses
    pub chunk_size: usize,
    /// Reject configurations without an API key
    pub require_api_key: bool,
    /// Make the connectivity probe fail
    pub probe_fails: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: MockMode::Echo,
            chunk_delay_ms: 0,
            chunk_size: 10,
            require_api_key: false,
            probe_fails: false,
        }
    }
}

/// A request the mock received, for assertions
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub options: ChatOptions,
}

/// Mock LLM provider for testing
pub struct MockProvider {
    provider_type: String,
    display_name: String,
    capabilities: ProviderCapabilities,
    provider_config: ProviderConfig,
    config: MockConfig,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    logger: SharedLogger,
}

impl MockProvider {
    /// Create a new mock provider with default config
    pub fn new(logger: SharedLogger) -> Self {
        Self::with_config(MockConfig::default(), logger)
    }

    /// Create with specific config
    pub fn with_config(config: MockConfig, logger: SharedLogger) -> Self {
        Self {
            provider_type: "mock".to_string(),
            display_name: "Mock Provider".to_string(),
            capabilities: ProviderCapabilities::full(128_000)
                .with_models(vec!["mock-echo".to_string(), "mock-fixed".to_string()]),
            provider_config: ProviderConfig::new("mock"),
            config,
            requests: Arc::new(Mutex::new(Vec::new())),
            logger,
        }
    }

    /// Create an echo provider (echoes back user message)
    pub fn echo(logger: SharedLogger) -> Self {
        Self::new(logger)
    }

    /// Create a fixed response provider
    pub fn fixed(response: impl Into<String>, logger: SharedLogger) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Fixed(response.into()),
                ..Default::default()
            },
            logger,
        )
    }

    /// Create a scripted provider
    pub fn scripted(steps: Vec<MockStep>, logger: SharedLogger) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Script(steps),
                ..Default::default()
            },
            logger,
        )
    }

    /// Create a provider that streams the given content chunks
    pub fn chunked(chunks: &[&str], logger: SharedLogger) -> Self {
        Self::scripted(chunks.iter().map(|c| MockStep::content(*c)).collect(), logger)
    }

    /// Create a provider whose stream fails to open
    pub fn error(message: impl Into<String>, logger: SharedLogger) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::OpenError(message.into()),
                ..Default::default()
            },
            logger,
        )
    }

    /// Masquerade as another provider type
    pub fn with_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = provider_type.into();
        self.display_name = format!("Mock ({})", self.provider_type);
        self.provider_config.provider_type = self.provider_type.clone();
        self
    }

    /// Replace the declared capabilities
    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set chunk delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.config.chunk_delay_ms = delay_ms;
        self
    }

    /// Set chunk size for splitting responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Require an API key in configuration
    pub fn requiring_api_key(mut self) -> Self {
        self.config.require_api_key = true;
        self
    }

    /// Make the connectivity probe fail
    pub fn with_failing_probe(mut self) -> Self {
        self.config.probe_fails = true;
        self
    }

    /// Handle to the requests this provider receives
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }

    /// Extract last user message content
    fn get_last_user_message(&self, messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User && !m.content.is_empty())
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.config.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.config.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn steps_for(&self, messages: &[ChatMessage]) -> ProviderResult<Vec<MockStep>> {
        let text_steps = |text: &str| -> Vec<MockStep> {
            self.split_into_chunks(text).into_iter().map(MockStep::content).collect()
        };

        match &self.config.mode {
            MockMode::Echo => {
                let user_msg = self.get_last_user_message(messages);
                Ok(text_steps(&format!("Echo: {}", user_msg)))
            }
            MockMode::Fixed(response) => Ok(text_steps(response)),
            MockMode::Script(steps) => Ok(steps.clone()),
            MockMode::Empty => Ok(Vec::new()),
            MockMode::OpenError(message) => Err(ProviderError::Other(message.clone())),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn provider_type(&self) -> &str {
        &self.provider_type
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn config(&self) -> &ProviderConfig {
        &self.provider_config
    }

    async fn initialize(&mut self, config: ProviderConfig) -> ProviderResult<()> {
        let validation = self.validate_config(&config);
        if !validation.is_valid {
            return Err(ProviderError::configuration(
                &self.provider_type,
                validation.errors.join("; "),
            ));
        }

        self.provider_config = config;

        if !self.test_connection().await {
            return Err(ProviderError::connectivity(&self.provider_type, "mock probe failed"));
        }

        self.logger.debug(&format!("MockProvider[{}]: initialized", self.provider_type));
        Ok(())
    }

    fn validate_config(&self, config: &ProviderConfig) -> ConfigValidation {
        let mut errors = Vec::new();

        if self.config.require_api_key && config.api_key.as_deref().map_or(true, str::is_empty) {
            errors.push(format!("API key is required for {}", self.provider_type));
        }
        if let Some(base) = &config.api_base {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                errors.push(format!("API base must be an http(s) URL: {}", base));
            }
        }

        ConfigValidation::from_errors(errors)
    }

    async fn test_connection(&self) -> bool {
        !self.config.probe_fails
    }

    async fn chat(&self, messages: Vec<ChatMessage>, options: ChatOptions) -> ProviderResult<ChatResponse> {
        let model = options.model.clone();
        let mut stream = self.stream_chat(messages, options, CancellationToken::new()).await?;

        let mut response = ChatResponse {
            model,
            ..Default::default()
        };
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content_delta {
                response.content.push_str(&text);
            }
            if let Some(thinking) = chunk.thinking_delta {
                response.thinking.get_or_insert_with(String::new).push_str(&thinking);
            }
            if chunk.response_id.is_some() {
                response.response_id = chunk.response_id;
            }
        }
        Ok(response)
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        self.logger.debug(&format!(
            "MockProvider[{}]: stream_chat called with {} messages",
            self.provider_type,
            messages.len()
        ));

        let steps = self.steps_for(&messages);
        self.requests.lock().push(RecordedRequest { messages, options });
        let steps = steps?;

        let delay_ms = self.config.chunk_delay_ms;
        let logger = self.logger.clone();

        let stream = stream::iter(steps.into_iter().enumerate()).filter_map(move |(i, step)| {
            let logger = logger.clone();
            let cancel = cancel_token.clone();
            async move {
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }

                match step {
                    MockStep::Chunk(chunk) => {
                        if cancel.is_cancelled() {
                            return Some(Err(ProviderError::Cancelled));
                        }
                        logger.debug(&format!("MockProvider: yielding chunk {}", i));
                        Some(Ok(chunk))
                    }
                    MockStep::Fail(message) => Some(Err(ProviderError::Other(message))),
                    MockStep::Cancel => {
                        cancel.cancel();
                        None
                    }
                    MockStep::Hang => {
                        futures::future::pending::<()>().await;
                        None
                    }
                    MockStep::Delay(ms) => {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        None
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    fn get_models(&self) -> Vec<ModelInfo> {
        let ids = if self.provider_config.models.is_empty() {
            &self.capabilities.supported_models
        } else {
            &self.provider_config.models
        };
        ids.iter()
            .map(|id| ModelInfo::new(id.clone(), self.provider_type.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn test_messages(content: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(content)]
    }

    async fn collect_content(stream: &mut StreamResponse) -> String {
        let mut result = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(text) = chunk.expect("chunk should succeed").content_delta {
                result.push_str(&text);
            }
        }
        result
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let provider = MockProvider::echo(NoOpLogger::shared());

        let mut stream = provider
            .stream_chat(test_messages("Hello, world!"), ChatOptions::new(), CancellationToken::new())
            .await
            .expect("stream should start");

        assert!(collect_content(&mut stream).await.contains("Hello, world!"));
    }

    #[tokio::test]
    async fn test_fixed_mode() {
        let provider = MockProvider::fixed("This is a test response.", NoOpLogger::shared());

        let mut stream = provider
            .stream_chat(test_messages("Anything"), ChatOptions::new(), CancellationToken::new())
            .await
            .expect("stream should start");

        assert_eq!(collect_content(&mut stream).await, "This is a test response.");
    }

    #[tokio::test]
    async fn test_script_failure_mid_stream() {
        let provider = MockProvider::scripted(
            vec![MockStep::content("Hi"), MockStep::Fail("boom".into())],
            NoOpLogger::shared(),
        );

        let mut stream = provider
            .stream_chat(test_messages("x"), ChatOptions::new(), CancellationToken::new())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_delays_pace_the_stream() {
        let provider = MockProvider::scripted(
            vec![MockStep::content("a"), MockStep::Delay(20), MockStep::content("b")],
            NoOpLogger::shared(),
        );
        let started = std::time::Instant::now();
        let mut stream = provider
            .stream_chat(test_messages("x"), ChatOptions::new(), CancellationToken::new())
            .await
            .unwrap();

        // Delay steps yield nothing themselves
        assert_eq!(collect_content(&mut stream).await, "ab");
        assert!(started.elapsed() >= Duration::from_millis(20));

        let provider = MockProvider::fixed("abcdef", NoOpLogger::shared())
            .with_chunk_size(2)
            .with_delay(10);
        let started = std::time::Instant::now();
        let mut stream = provider
            .stream_chat(test_messages("x"), ChatOptions::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(collect_content(&mut stream).await, "abcdef");
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_cancel_step_signals_token() {
        let provider = MockProvider::scripted(
            vec![MockStep::content("a"), MockStep::Cancel, MockStep::content("b")],
            NoOpLogger::shared(),
        );
        let cancel = CancellationToken::new();

        let mut stream = provider
            .stream_chat(test_messages("x"), ChatOptions::new(), cancel.clone())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(stream.next().await, Some(Err(ProviderError::Cancelled))));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_open_error_is_recorded() {
        let provider = MockProvider::error("down", NoOpLogger::shared());
        let requests = provider.requests();

        let result = provider
            .stream_chat(test_messages("x"), ChatOptions::new().with_model("m"), CancellationToken::new())
            .await;

        assert!(result.is_err());
        let requests = requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].options.model.as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn test_chat_collects_stream() {
        let provider = MockProvider::scripted(
            vec![
                MockStep::thinking("hmm"),
                MockStep::content("Hi"),
                MockStep::Chunk(StreamChunk::content(" there").with_response_id("resp_9")),
            ],
            NoOpLogger::shared(),
        );

        let response = provider.chat(test_messages("x"), ChatOptions::new()).await.unwrap();
        assert_eq!(response.content, "Hi there");
        assert_eq!(response.thinking.as_deref(), Some("hmm"));
        assert_eq!(response.response_id.as_deref(), Some("resp_9"));
    }

    #[tokio::test]
    async fn test_initialize_rejects_missing_key() {
        let mut provider = MockProvider::new(NoOpLogger::shared()).requiring_api_key();
        let err = provider.initialize(ProviderConfig::new("mock")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));

        provider
            .initialize(ProviderConfig::new("mock").with_api_key("k"))
            .await
            .expect("valid config should initialize");
        assert_eq!(provider.config().api_key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_initialize_reports_failed_probe() {
        let mut provider = MockProvider::new(NoOpLogger::shared()).with_failing_probe();
        let err = provider.initialize(ProviderConfig::new("mock")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Connectivity { .. }));
    }

    #[test]
    fn test_models_and_type() {
        let provider = MockProvider::new(NoOpLogger::shared()).with_type("openai");
        assert_eq!(provider.provider_type(), "openai");
        assert!(provider.get_model("mock-echo").is_some());
        assert!(provider.get_model("nope").is_none());
        assert!(provider.supports_streaming());
    }

    #[test]
    fn test_chunk_splitting() {
        let provider = MockProvider::new(NoOpLogger::shared()).with_chunk_size(5);
        let chunks = provider.split_into_chunks("Hello, world!");

        assert_eq!(chunks, vec!["Hello", ", wor", "ld!"]);
    }
}
