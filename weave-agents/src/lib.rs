//! Tool-augmented conversational agents.
//!
//! Bundles the runtime crates behind feature flags so downstream users can
//! pull in only what they need. With the default features, [`kernel::Agent`]
//! is the entry point.

#![warn(missing_docs, clippy::pedantic)]

/// Shared value types: capability descriptors, messages, identifiers.
pub use agent_primitives as primitives;

/// Orchestration loop and agent bootstrap (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use agent_kernel as kernel;

/// Model transports (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use agent_adapters as adapters;

/// Capability registry, directive parsing, remote tool sources (enabled by
/// `tools` feature).
#[cfg(feature = "tools")]
pub use agent_tools as tools;

/// Conversation history (enabled by `memory` feature).
#[cfg(feature = "memory")]
pub use agent_memory as memory;

/// Structured events and subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;

/// System prompt templates (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use agent_prompts as prompts;

/// TOML and environment configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;
