//! Configuration for agents.
//!
//! [`AgentConfig`] is read from a named table of a TOML file or from
//! environment variables, and resolves provider credentials the same way in
//! both cases.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod loader;
mod provider;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::DEFAULT_PROFILE;
pub use provider::{Credentials, Provider};
pub use schema::{AgentConfig, ToolServerConfig};
