//! Response stream consumption

mod consumer;

pub use consumer::{interruption_notice, StreamOutcome, StreamingConsumer, EMPTY_INTERRUPTION_MESSAGE};
