use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::capability::{Parameters, ToolResult};

/// Catalog entry advertised by a tool server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RemoteToolInfo {
    /// Server-side tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema of the arguments.
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

/// Something that can open sessions with a tool server.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &str;

    /// Opens a new, initialised session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be started or the handshake
    /// fails.
    async fn connect(&self) -> ToolResult<Box<dyn ToolSession>>;
}

/// An open connection to a tool server.
///
/// Dropping a session releases the server even if [`close`](Self::close)
/// was never called.
#[async_trait]
pub trait ToolSession: Send {
    /// Lists every tool the server offers.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol or transport failure.
    async fn list_tools(&mut self) -> ToolResult<Vec<RemoteToolInfo>>;

    /// Calls a tool and returns its textual result.
    ///
    /// # Errors
    ///
    /// Returns an error on protocol failure or when the server flags the
    /// call as failed.
    async fn call_tool(&mut self, name: &str, arguments: Parameters) -> ToolResult<String>;

    /// Shuts the session down.
    ///
    /// # Errors
    ///
    /// Returns an error if the server could not be stopped cleanly.
    async fn close(&mut self) -> ToolResult<()>;
}
