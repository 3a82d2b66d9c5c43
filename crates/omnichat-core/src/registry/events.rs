//! Registry lifecycle events and listener types

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::providers::Provider;

/// Event names listeners subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryEventKind {
    ProviderRegistered,
    ProviderUnregistered,
    ActiveProviderChanged,
}

impl RegistryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryEventKind::ProviderRegistered => "providerRegistered",
            RegistryEventKind::ProviderUnregistered => "providerUnregistered",
            RegistryEventKind::ActiveProviderChanged => "activeProviderChanged",
        }
    }
}

/// A registry lifecycle event
#[derive(Clone)]
pub enum RegistryEvent {
    ProviderRegistered {
        provider_type: String,
    },
    ProviderUnregistered {
        provider_type: String,
    },
    ActiveProviderChanged {
        previous: Option<String>,
        current: Option<String>,
        provider: Option<Arc<dyn Provider>>,
    },
}

impl RegistryEvent {
    pub fn kind(&self) -> RegistryEventKind {
        match self {
            RegistryEvent::ProviderRegistered { .. } => RegistryEventKind::ProviderRegistered,
            RegistryEvent::ProviderUnregistered { .. } => RegistryEventKind::ProviderUnregistered,
            RegistryEvent::ActiveProviderChanged { .. } => RegistryEventKind::ActiveProviderChanged,
        }
    }
}

impl std::fmt::Debug for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::ProviderRegistered { provider_type } => f
                .debug_struct("ProviderRegistered")
                .field("provider_type", provider_type)
                .finish(),
            RegistryEvent::ProviderUnregistered { provider_type } => f
                .debug_struct("ProviderUnregistered")
                .field("provider_type", provider_type)
                .finish(),
            RegistryEvent::ActiveProviderChanged { previous, current, provider } => f
                .debug_struct("ActiveProviderChanged")
                .field("previous", previous)
                .field("current", current)
                .field("provider", &provider.as_ref().map(|p| p.provider_type().to_string()))
                .finish(),
        }
    }
}

/// Error a listener may return; it is logged and swallowed
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked synchronously for each matching event
pub type Listener = Arc<dyn Fn(&RegistryEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Handle for removing a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}
