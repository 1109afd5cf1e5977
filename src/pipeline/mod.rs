//! The message-orchestration pipeline.

pub mod classifier;
pub mod processor;
pub mod rules;
pub mod synthesizer;
pub mod types;

pub use processor::MessageProcessor;
pub use types::{ChatTurn, InboundRequest, Intent, IntentDecision, OutboundResponse};
