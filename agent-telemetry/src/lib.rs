//! Observability utilities for agents.
//!
//! Library crates never print. They report [`AgentEvent`]s to an injected
//! [`EventSink`] and log through `tracing`; binaries decide where the output
//! goes via [`init_tracing`].

#![warn(missing_docs, clippy::pedantic)]

mod events;
mod subscriber;

pub use events::{
    AgentEvent, CollectingSink, EventLevel, EventSink, FanoutSink, ToolOutcome, TracingSink,
};
pub use subscriber::{TelemetryConfig, TelemetryError, init_tracing};
