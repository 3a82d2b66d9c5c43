//! Credential lookup for provider API keys
//!
//! - `SecretStore` trait for host-supplied stores
//! - `EnvSecretStore`: read-only, environment variables
//! - `MemorySecretStore`: in-memory, for tests and ephemeral hosts

mod traits;
mod env_store;
mod memory_store;

pub use traits::{SecretInfo, SecretStore, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
