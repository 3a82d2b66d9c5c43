//! Provider error types

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Configuration rejected by the provider
    #[error("{provider} configuration error: {message}")]
    Configuration { provider: String, message: String },

    /// Connectivity probe failed during initialization
    #[error("could not reach {provider}: {message}")]
    Connectivity { provider: String, message: String },

    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Stream ended unexpectedly
    #[error("Stream ended unexpectedly")]
    StreamEnded,

    /// Invalid response from provider
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Rate limited
    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create a configuration error
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a connectivity error
    pub fn connectivity(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an API error
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Connectivity { .. } => "connectivity",
            Self::MissingApiKey { .. } => "missing_api_key",
            Self::ApiError { .. } => "api_error",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Cancelled => "cancelled",
            Self::StreamEnded => "stream_ended",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::Other(_) => "other",
        }
    }

    /// Whether this looks like a transient network failure
    pub fn is_network_like(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Connectivity { .. } | Self::StreamEnded => true,
            other => is_network_like_message(&other.to_string()),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            other => other.is_network_like(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

static NETWORK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)network|timed?\s?out|timeout|connection|econn\w*|socket|fetch failed|dns")
        .expect("network pattern is a valid regex")
});

/// Pattern-match an error message for network, timeout or connection failures
pub fn is_network_like_message(message: &str) -> bool {
    NETWORK_PATTERN.is_match(message)
}

/// A provider failure normalized into one user-presentable shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedError {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
    pub retryable: bool,
}

impl FormattedError {
    /// Default normalization used by providers that don't specialize it
    pub fn from_provider_error(provider_type: &str, error: &ProviderError) -> Self {
        let message = match error {
            ProviderError::MissingApiKey { provider } => {
                format!("No API key configured for {}. Add your credentials in settings.", provider)
            }
            ProviderError::RateLimited { provider, .. } => {
                format!("{} is rate limiting requests. Please wait a moment and try again.", provider)
            }
            ProviderError::ApiError { status: 401 | 403, provider, .. } => {
                format!("{} rejected the credentials. Check your API key.", provider)
            }
            other => other.to_string(),
        };

        Self {
            message,
            code: error.code().to_string(),
            provider_type: Some(provider_type.to_string()),
            retryable: error.is_retryable(),
        }
    }
}

impl std::fmt::Display for FormattedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_like_messages() {
        assert!(is_network_like_message("Network error while reading body"));
        assert!(is_network_like_message("request timed out"));
        assert!(is_network_like_message("Timeout after 30s"));
        assert!(is_network_like_message("ECONNRESET"));
        assert!(is_network_like_message("Connection refused"));
        assert!(!is_network_like_message("invalid model id"));
    }

    #[test]
    fn test_error_codes_and_retryability() {
        let err = ProviderError::rate_limited("openai", "slow down");
        assert_eq!(err.code(), "rate_limited");
        assert!(err.is_retryable());

        let err = ProviderError::api_error("openai", 400, "bad request");
        assert!(!err.is_retryable());

        let err = ProviderError::api_error("openai", 503, "unavailable");
        assert!(err.is_retryable());

        let err = ProviderError::Other("socket hang up".into());
        assert!(err.is_network_like());
    }

    #[test]
    fn test_formatted_error_for_missing_key() {
        let err = ProviderError::missing_api_key("anthropic");
        let formatted = FormattedError::from_provider_error("anthropic", &err);
        assert!(formatted.message.contains("No API key configured for anthropic"));
        assert_eq!(formatted.code, "missing_api_key");
        assert_eq!(formatted.provider_type.as_deref(), Some("anthropic"));
        assert!(!formatted.retryable);
    }
}
