//! Tool discovery, registration, and invocation for agents.
//!
//! * [`capability`] defines the invocable [`Capability`] trait.
//! * [`registry`] maps names to capabilities, expanding dynamic catalogs.
//! * [`directive`] extracts `[TOOL_CALL:<name>:<params>]` directives from
//!   model output and [`coerce`] turns their parameter blobs into typed
//!   values.
//! * [`remote`] hosts tools in external processes.

#![warn(missing_docs, clippy::pedantic)]

pub mod capability;
pub mod coerce;
pub mod directive;
pub mod discovery;
pub mod registry;
pub mod remote;

pub use capability::{Capability, FnCapability, Parameters, ToolError, ToolResult};
pub use coerce::{coerce_parameters, split_parameters};
pub use directive::{Directive, Directives, parse_directives, strip_directives};
pub use discovery::{DiscoveryConfig, DiscoveryError};
pub use registry::{CapabilityRegistry, NO_CAPABILITIES, Registration};
