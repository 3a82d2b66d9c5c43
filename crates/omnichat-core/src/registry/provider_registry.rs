//! Provider registry: registered providers, the active pointer, and
//! lifecycle event dispatch

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::events::{Listener, ListenerError, ListenerId, RegistryEvent, RegistryEventKind};
use crate::logging::SharedLogger;
use crate::providers::{supported_providers, Provider};

/// Errors from registry operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Provider failed registration checks
    #[error("invalid provider '{provider_type}': {reason}")]
    InvalidProvider { provider_type: String, reason: String },

    /// No provider registered under this type
    #[error("provider not registered: {0}")]
    NotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Default)]
struct RegistryState {
    providers: HashMap<String, Arc<dyn Provider>>,
    /// Registration order, for stable listing
    order: Vec<String>,
    active: Option<String>,
}

/// Owns the registered providers and tracks the single active one.
///
/// Invariant: when `active` is set, a provider for that type is registered.
/// All mutation goes through the methods below; events are dispatched after
/// the state lock is released, synchronously and in listener registration
/// order.
pub struct ProviderRegistry {
    state: Mutex<RegistryState>,
    listeners: Mutex<HashMap<RegistryEventKind, Vec<(ListenerId, Listener)>>>,
    known_types: HashSet<String>,
    logger: SharedLogger,
}

impl ProviderRegistry {
    /// Registry accepting the built-in provider type tags
    pub fn new(logger: SharedLogger) -> Self {
        Self::with_known_types(supported_providers(), logger)
    }

    /// Registry accepting only the given type tags
    pub fn with_known_types<I, S>(types: I, logger: SharedLogger) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            state: Mutex::new(RegistryState::default()),
            listeners: Mutex::new(HashMap::new()),
            known_types: types.into_iter().map(|t| t.as_ref().to_lowercase()).collect(),
            logger,
        }
    }

    /// Register a provider, replacing any existing one of the same type
    pub fn register(&self, provider: Arc<dyn Provider>) -> RegistryResult<()> {
        self.validate(provider.as_ref())?;

        let provider_type = provider.provider_type().to_string();
        let replaced = {
            let mut state = self.state.lock();
            let replaced = state.providers.insert(provider_type.clone(), provider).is_some();
            if !replaced {
                state.order.push(provider_type.clone());
            }
            replaced
        };

        self.logger.info(&format!(
            "[ProviderRegistry] {} provider '{}'",
            if replaced { "Replaced" } else { "Registered" },
            provider_type
        ));
        self.emit(RegistryEvent::ProviderRegistered { provider_type });
        Ok(())
    }

    /// Remove a provider. Returns false if it was not registered.
    ///
    /// Unregistering the active provider clears the active pointer first.
    pub fn unregister(&self, provider_type: &str) -> bool {
        if !self.has_provider(provider_type) {
            return false;
        }

        let was_active = {
            let mut state = self.state.lock();
            if state.active.as_deref() == Some(provider_type) {
                state.active = None;
                true
            } else {
                false
            }
        };
        if was_active {
            self.logger.info(&format!(
                "[ProviderRegistry] Cleared active provider '{}' before unregistering",
                provider_type
            ));
            self.emit(RegistryEvent::ActiveProviderChanged {
                previous: Some(provider_type.to_string()),
                current: None,
                provider: None,
            });
        }

        let removed = {
            let mut state = self.state.lock();
            state.order.retain(|t| t != provider_type);
            state.providers.remove(provider_type).is_some()
        };
        if removed {
            self.logger.info(&format!("[ProviderRegistry] Unregistered provider '{}'", provider_type));
            self.emit(RegistryEvent::ProviderUnregistered {
                provider_type: provider_type.to_string(),
            });
        }
        removed
    }

    /// Make a registered provider the active one. No-op if already active.
    pub fn set_active_provider(&self, provider_type: &str) -> RegistryResult<()> {
        let (previous, provider) = {
            let mut state = self.state.lock();
            if state.active.as_deref() == Some(provider_type) {
                return Ok(());
            }
            let provider = state
                .providers
                .get(provider_type)
                .cloned()
                .ok_or_else(|| RegistryError::NotFound(provider_type.to_string()))?;
            let previous = state.active.replace(provider_type.to_string());
            (previous, provider)
        };

        self.logger.info(&format!(
            "[ProviderRegistry] Active provider changed: {} -> {}",
            previous.as_deref().unwrap_or("none"),
            provider_type
        ));
        self.emit(RegistryEvent::ActiveProviderChanged {
            previous,
            current: Some(provider_type.to_string()),
            provider: Some(provider),
        });
        Ok(())
    }

    /// The active provider, if any
    pub fn get_active_provider(&self) -> Option<Arc<dyn Provider>> {
        let state = self.state.lock();
        state
            .active
            .as_ref()
            .and_then(|t| state.providers.get(t))
            .cloned()
    }

    /// Type tag of the active provider, if any
    pub fn get_active_provider_type(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    /// Look up a registered provider
    pub fn get_provider(&self, provider_type: &str) -> Option<Arc<dyn Provider>> {
        self.state.lock().providers.get(provider_type).cloned()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.state.lock().providers.contains_key(provider_type)
    }

    /// Registered type tags, in registration order
    pub fn get_registered_providers(&self) -> Vec<String> {
        self.state.lock().order.clone()
    }

    /// Unregister every provider, clearing the active one first
    pub fn clear(&self) {
        if let Some(active) = self.get_active_provider_type() {
            self.unregister(&active);
        }
        for provider_type in self.get_registered_providers() {
            self.unregister(&provider_type);
        }
    }

    /// Subscribe to an event
    pub fn on<F>(&self, kind: RegistryEventKind, listener: F) -> ListenerId
    where
        F: Fn(&RegistryEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = ListenerId::next();
        let listener: Listener = Arc::new(listener);
        self.listeners.lock().entry(kind).or_default().push((id, listener));
        id
    }

    /// Unsubscribe. Returns false if the listener was not found.
    pub fn off(&self, kind: RegistryEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(lid, _)| *lid != id);
                list.len() != before
            }
            None => false,
        }
    }

    fn validate(&self, provider: &dyn Provider) -> RegistryResult<()> {
        let provider_type = provider.provider_type();
        let invalid = |reason: String| RegistryError::InvalidProvider {
            provider_type: provider_type.to_string(),
            reason,
        };

        if provider_type.trim().is_empty() {
            return Err(invalid("provider type is empty".to_string()));
        }
        if !self.known_types.contains(&provider_type.to_lowercase()) {
            return Err(invalid("unrecognized provider type".to_string()));
        }
        if provider.display_name().trim().is_empty() {
            return Err(invalid("display name is empty".to_string()));
        }

        let capabilities = provider.capabilities();
        let missing = capabilities.missing_flags();
        if !missing.is_empty() {
            let names: Vec<_> = missing.iter().map(|f| f.as_str()).collect();
            return Err(invalid(format!("capabilities missing: {}", names.join(", "))));
        }
        if capabilities.max_context_length == 0 {
            return Err(invalid("capabilities missing: maxContextLength".to_string()));
        }
        Ok(())
    }

    fn emit(&self, event: RegistryEvent) {
        let kind = event.kind();
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .get(&kind)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.logger.error(&format!(
                    "[ProviderRegistry] Listener for {} failed: {}",
                    kind.as_str(),
                    e
                )),
                Err(_) => self.logger.error(&format!(
                    "[ProviderRegistry] Listener for {} panicked",
                    kind.as_str()
                )),
            }
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProviderRegistry")
            .field("providers", &state.order)
            .field("active", &state.active)
            .finish()
    }
}
