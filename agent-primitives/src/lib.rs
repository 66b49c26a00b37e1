//! Core shared types for tool-calling agents.

#![warn(missing_docs, clippy::pedantic)]

mod capability;
mod error;
mod ids;
mod message;

/// Capability descriptors and their typed parameter declarations.
pub use capability::{
    CapabilityDescriptor, CapabilityDescriptorBuilder, ParameterSpec, ParameterType,
};
/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Unique identifier for an agent instance (one conversation thread).
pub use ids::AgentId;
/// Role-tagged chat messages exchanged with the model.
pub use message::{MessageRole, PromptMessage};
