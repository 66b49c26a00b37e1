//! Tools hosted by external processes.
//!
//! A [`ToolSource`] opens short-lived [`ToolSession`]s; [`RemoteToolset`] is
//! the expandable capability that turns a source's catalog into one
//! [`RemoteTool`] per entry.

mod schema;
mod source;
mod stdio;
mod toolset;

pub use schema::parameters_from_schema;
pub use source::{RemoteToolInfo, ToolSession, ToolSource};
pub use stdio::StdioToolSource;
pub use toolset::{RemoteTool, RemoteToolset};
