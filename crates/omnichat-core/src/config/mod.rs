//! Settings storage
//!
//! - `MemorySettingsStore`: in-memory for testing
//! - `FileSettingsStore`: YAML file-based (user level)

mod traits;
mod memory;
mod file;

pub use traits::{ConfigError, ConfigResult, Settings, SettingsStore};
pub use memory::MemorySettingsStore;
pub use file::FileSettingsStore;
