//! Provider registry
//!
//! Tracks which provider implementations are registered, which one is
//! active, and notifies listeners of lifecycle changes.

mod events;
mod provider_registry;

pub use events::{Listener, ListenerError, ListenerId, RegistryEvent, RegistryEventKind};
pub use provider_registry::{ProviderRegistry, RegistryError, RegistryResult};
