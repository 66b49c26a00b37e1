//! Orchestration loop for tool-augmented agents.
//!
//! An [`Agent`] composes the outbound conversation, calls the model, runs
//! any `[TOOL_CALL:..]` directives found in the reply against its registry,
//! feeds the results back, and repeats until the model answers without
//! directives or the iteration bound forces a final call.

#![warn(missing_docs, clippy::pedantic)]

mod agent;
pub mod bootstrap;
mod dispatch;
mod error;
mod turn;

pub use agent::{
    Agent, AgentBuilder, DEFAULT_MAX_ITERATIONS, FINAL_ANSWER_INSTRUCTION, InferenceOptions,
    NullOutput, OutputSink,
};
pub use bootstrap::agent_from_config;
pub use dispatch::{ToolReport, dispatch, failure_text, not_found_text, result_text};
pub use error::{KernelError, KernelResult};
pub use turn::{Turn, TurnError, TurnEvent, TurnPhase, TurnResult};
