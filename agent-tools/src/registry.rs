//! Name-keyed store of capabilities owned by one agent.

use std::collections::HashMap;
use std::sync::Arc;

use agent_primitives::CapabilityDescriptor;
use agent_telemetry::{AgentEvent, EventSink, TracingSink};

use crate::capability::Capability;
use crate::discovery::{DiscoveryConfig, discover};

/// Description text returned when nothing is registered.
pub const NO_CAPABILITIES: &str = "No tools available";

/// What a registration call did to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The capability was stored under its own name.
    Registered {
        /// Registered name.
        name: String,
        /// Whether an existing entry of the same name was replaced.
        replaced: bool,
    },
    /// An expandable capability was replaced by its discovered children.
    Expanded {
        /// Name of the expandable capability, which is not itself stored.
        parent: String,
        /// Names of the registered children, in discovery order.
        names: Vec<String>,
    },
    /// Discovery produced nothing; the registry is unchanged.
    Skipped {
        /// Name of the expandable capability.
        parent: String,
        /// Why nothing was registered.
        reason: String,
    },
}

impl Registration {
    /// Names added or replaced by this registration.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Registered { name, .. } => vec![name.as_str()],
            Self::Expanded { names, .. } => names.iter().map(String::as_str).collect(),
            Self::Skipped { .. } => Vec::new(),
        }
    }
}

/// Registry mapping names to capabilities.
///
/// Names are unique; registering a name twice keeps the later capability in
/// the earlier one's position, so [`describe_all`](Self::describe_all) keeps
/// insertion order.
pub struct CapabilityRegistry {
    entries: Vec<Arc<dyn Capability>>,
    index: HashMap<String, usize>,
    events: Arc<dyn EventSink>,
    discovery: DiscoveryConfig,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("registered", &self.names())
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}

impl CapabilityRegistry {
    /// Creates an empty registry that reports to `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            events: Arc::new(TracingSink),
            discovery: DiscoveryConfig::default(),
        }
    }

    /// Routes registry events to the supplied sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Overrides discovery settings.
    #[must_use]
    pub fn with_discovery_config(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Registers a capability without expansion.
    pub fn add(&mut self, capability: Arc<dyn Capability>) -> Registration {
        let name = capability.name().to_owned();
        let replaced = self.insert(capability);
        Registration::Registered { name, replaced }
    }

    /// Registers a capability.
    ///
    /// When `expand` is set and the capability is expandable, it is replaced
    /// by the capabilities its discovery returns. A failed or empty
    /// discovery registers nothing and leaves the registry as it was; the
    /// outcome is reported through the event sink rather than as an error.
    pub async fn register(
        &mut self,
        capability: Arc<dyn Capability>,
        expand: bool,
    ) -> Registration {
        if !(expand && capability.is_expandable()) {
            return self.add(capability);
        }

        let parent = capability.name().to_owned();
        match discover(capability, &self.discovery).await {
            Ok(children) if children.is_empty() => {
                self.events.emit(AgentEvent::DiscoveryEmpty {
                    parent: parent.clone(),
                });
                Registration::Skipped {
                    parent,
                    reason: "no tools discovered".into(),
                }
            }
            Ok(children) => {
                let names: Vec<String> = children
                    .into_iter()
                    .map(|child| {
                        let name = child.name().to_owned();
                        self.insert(child);
                        name
                    })
                    .collect();
                self.events.emit(AgentEvent::CapabilityExpanded {
                    parent: parent.clone(),
                    count: names.len(),
                });
                Registration::Expanded { parent, names }
            }
            Err(err) => {
                let reason = err.to_string();
                self.events.emit(AgentEvent::DiscoveryFailed {
                    parent: parent.clone(),
                    reason: reason.clone(),
                });
                Registration::Skipped { parent, reason }
            }
        }
    }

    fn insert(&mut self, capability: Arc<dyn Capability>) -> bool {
        let name = capability.name().to_owned();
        if let Some(&slot) = self.index.get(&name) {
            self.entries[slot] = capability;
            self.events.emit(AgentEvent::CapabilityReplaced { name });
            return true;
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(capability);
        self.events.emit(AgentEvent::CapabilityRegistered { name });
        false
    }

    /// Looks up a capability by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.entries[slot]))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name()).collect()
    }

    /// Descriptors in insertion order.
    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries.iter().map(|entry| entry.descriptor())
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `<name>: <description>` line per capability, in insertion order.
    ///
    /// Returns [`NO_CAPABILITIES`] for an empty registry.
    #[must_use]
    pub fn describe_all(&self) -> String {
        if self.entries.is_empty() {
            return NO_CAPABILITIES.to_owned();
        }
        self.descriptors()
            .map(|descriptor| format!("{}: {}", descriptor.name(), descriptor.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
