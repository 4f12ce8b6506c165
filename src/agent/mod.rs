//! Conversation orchestration: history plus the tool-calling turn loop.

pub mod conversation;
pub mod orchestrator;

pub use conversation::Conversation;
pub use orchestrator::{Orchestrator, OrchestratorSettings, TurnOutcome, DEFAULT_FAILURE_NOTICE};
