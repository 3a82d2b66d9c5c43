//! Message orchestration: validation, prompt assembly, model overrides,
//! streaming and guaranteed cleanup

mod message_orchestrator;
mod types;

pub use message_orchestrator::MessageOrchestrator;
pub use types::{ModelOverrideContext, OrchestratorStats, SendOptions, SendOutcome};
