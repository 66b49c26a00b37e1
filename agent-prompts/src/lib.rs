//! Prompt construction for agents.
//!
//! [`PromptTemplate`] renders `{{variable}}` placeholders; [`SystemPrompt`]
//! combines the agent's base prompt with the tool-usage instructions that
//! teach the model the `[TOOL_CALL:...]` directive syntax.

#![warn(missing_docs, clippy::pedantic)]

pub mod system;
pub mod template;

pub use system::{DEFAULT_SYSTEM_PROMPT, SystemPrompt, TOOL_USAGE_TEMPLATE};
pub use template::{PromptTemplate, TemplateError, TemplateResult};
