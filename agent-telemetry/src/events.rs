//! Structured events reported by the registry and the orchestration loop.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Severity attached to an [`AgentEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Step-by-step loop internals.
    Debug,
    /// Normal milestones.
    Info,
    /// Degraded behaviour an operator should know about.
    Warn,
    /// A failure that ends the current call.
    Error,
}

/// How a single tool dispatch ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The capability returned a result.
    Succeeded,
    /// No capability is registered under the requested name.
    NotFound,
    /// The capability reported an error.
    Failed {
        /// Error text returned by the capability.
        reason: String,
    },
}

/// Observation emitted by the runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A top-level call entered the loop.
    TurnStarted {
        /// Short agent identifier.
        agent: String,
        /// Length of the user input in characters.
        input_chars: usize,
    },
    /// The model transport is about to be invoked.
    ModelCalled {
        /// One-based round number.
        round: usize,
        /// Whether this is the unconditional call after the iteration bound.
        forced: bool,
        /// Whether the response is consumed as a stream.
        streaming: bool,
    },
    /// Directives were found in a model response.
    DirectivesParsed {
        /// One-based round number.
        round: usize,
        /// Number of directives extracted.
        count: usize,
    },
    /// A directive was dispatched against the registry.
    ToolDispatched {
        /// Requested tool name.
        tool: String,
        /// Dispatch result.
        outcome: ToolOutcome,
    },
    /// Every tool-augmented round was used up.
    IterationLimitReached {
        /// Configured bound.
        max_iterations: usize,
    },
    /// The model transport failed and the call is aborted.
    TransportFailed {
        /// Error text from the transport.
        reason: String,
    },
    /// A top-level call produced its final answer.
    TurnCompleted {
        /// Model calls performed, including a forced final call.
        model_calls: usize,
        /// Tool dispatches performed.
        tool_calls: usize,
    },
    /// A capability was added to a registry.
    CapabilityRegistered {
        /// Registered name.
        name: String,
    },
    /// A registration replaced an existing capability of the same name.
    CapabilityReplaced {
        /// Contested name.
        name: String,
    },
    /// An expandable capability was replaced by its discovered children.
    CapabilityExpanded {
        /// Name of the expandable capability.
        parent: String,
        /// Number of sub-capabilities registered.
        count: usize,
    },
    /// Discovery failed; nothing was registered for the parent.
    DiscoveryFailed {
        /// Name of the expandable capability.
        parent: String,
        /// Failure description.
        reason: String,
    },
    /// Discovery succeeded but reported no tools; nothing was registered.
    DiscoveryEmpty {
        /// Name of the expandable capability.
        parent: String,
    },
}

impl AgentEvent {
    /// Returns the severity of the event.
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::ModelCalled { .. } | Self::DirectivesParsed { .. } => EventLevel::Debug,
            Self::ToolDispatched {
                outcome: ToolOutcome::Succeeded,
                ..
            }
            | Self::TurnStarted { .. }
            | Self::TurnCompleted { .. }
            | Self::CapabilityRegistered { .. }
            | Self::CapabilityExpanded { .. } => EventLevel::Info,
            Self::ToolDispatched { .. }
            | Self::IterationLimitReached { .. }
            | Self::CapabilityReplaced { .. }
            | Self::DiscoveryFailed { .. }
            | Self::DiscoveryEmpty { .. } => EventLevel::Warn,
            Self::TransportFailed { .. } => EventLevel::Error,
        }
    }
}

/// Receiver for runtime events.
pub trait EventSink: Send + Sync {
    /// Records the supplied event.
    fn emit(&self, event: AgentEvent);
}

/// Sink that forwards events to `tracing` at their own level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: AgentEvent) {
        match event.level() {
            EventLevel::Debug => debug!(event = ?event, "agent event"),
            EventLevel::Info => info!(event = ?event, "agent event"),
            EventLevel::Warn => warn!(event = ?event, "agent event"),
            EventLevel::Error => error!(event = ?event, "agent event"),
        }
    }
}

/// Sink that keeps every event in memory; mostly useful in tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl CollectingSink {
    /// Creates a shareable collecting sink.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Removes and returns every collected event.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn drain(&self) -> Vec<AgentEvent> {
        let mut guard = self.events.lock().expect("collecting sink poisoned");
        guard.drain(..).collect()
    }

    /// Returns a copy of the collected events at or above `level`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn at_least(&self, level: EventLevel) -> Vec<AgentEvent> {
        let guard = self.events.lock().expect("collecting sink poisoned");
        guard
            .iter()
            .filter(|event| event.level() >= level)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: AgentEvent) {
        self.events
            .lock()
            .expect("collecting sink poisoned")
            .push(event);
    }
}

/// Forwards every event to a list of sinks.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates a fan-out sink from the supplied list.
    #[must_use]
    pub fn new<I>(sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn EventSink>>,
    {
        Self {
            sinks: sinks.into_iter().collect(),
        }
    }

    /// Adds a sink.
    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: AgentEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_severity() {
        let ok = AgentEvent::ToolDispatched {
            tool: "echo".into(),
            outcome: ToolOutcome::Succeeded,
        };
        let missing = AgentEvent::ToolDispatched {
            tool: "echo".into(),
            outcome: ToolOutcome::NotFound,
        };
        assert_eq!(ok.level(), EventLevel::Info);
        assert_eq!(missing.level(), EventLevel::Warn);
        assert_eq!(
            AgentEvent::TransportFailed { reason: "x".into() }.level(),
            EventLevel::Error
        );
    }

    #[test]
    fn collecting_sink_filters_by_level() {
        let sink = CollectingSink::new();
        sink.emit(AgentEvent::DirectivesParsed { round: 1, count: 2 });
        sink.emit(AgentEvent::DiscoveryEmpty {
            parent: "git".into(),
        });

        let warnings = sink.at_least(EventLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let first = CollectingSink::new();
        let second = CollectingSink::new();
        let fanout = FanoutSink::new([
            first.clone() as Arc<dyn EventSink>,
            second.clone() as Arc<dyn EventSink>,
            Arc::new(TracingSink) as Arc<dyn EventSink>,
        ]);

        fanout.emit(AgentEvent::CapabilityRegistered {
            name: "echo".into(),
        });

        assert_eq!(first.drain().len(), 1);
        assert_eq!(second.drain().len(), 1);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = AgentEvent::DiscoveryFailed {
            parent: "git".into(),
            reason: "spawn failed".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "discovery_failed");
        assert_eq!(json["parent"], "git");
    }
}
