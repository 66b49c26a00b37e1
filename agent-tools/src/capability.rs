//! The invocable unit held by a registry.

use std::future::Future;
use std::sync::Arc;

use agent_primitives::CapabilityDescriptor;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Named, already-coerced arguments passed to a capability.
pub type Parameters = Map<String, Value>;

/// Errors produced by capabilities and tool sources.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A descriptor failed validation.
    #[error(transparent)]
    InvalidDescriptor(#[from] agent_primitives::Error),

    /// Arguments did not satisfy the capability's expectations.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable explanation.
        reason: String,
    },

    /// The capability ran and reported a failure.
    #[error("{reason}")]
    Execution {
        /// Error text surfaced to the model.
        reason: String,
    },

    /// Listing the tools behind an expandable capability failed.
    #[error("discovery failed: {reason}")]
    Discovery {
        /// Human-readable explanation.
        reason: String,
    },

    /// A remote tool server violated the wire protocol.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Human-readable explanation.
        reason: String,
    },

    /// Payload could not be encoded or decoded.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// I/O with a tool process failed.
    #[error("i/o error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Convenience constructor for [`ToolError::InvalidArguments`].
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`ToolError::Execution`].
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`ToolError::Discovery`].
    #[must_use]
    pub fn discovery(reason: impl Into<String>) -> Self {
        Self::Discovery {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`ToolError::Protocol`].
    #[must_use]
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }
}

/// A named, described, parameterized operation the model may request.
///
/// Expandable capabilities stand in for a catalog that is only known at
/// runtime; registering one with expansion enabled replaces it by the
/// capabilities returned from [`expand`](Self::expand).
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, description, and parameter declarations.
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Registry key; shorthand for the descriptor's name.
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Whether [`expand`](Self::expand) yields a dynamic catalog.
    fn is_expandable(&self) -> bool {
        false
    }

    /// Discovers the concrete capabilities behind this one.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying catalog cannot be listed.
    async fn expand(&self) -> ToolResult<Vec<Arc<dyn Capability>>> {
        Ok(Vec::new())
    }

    /// Executes the capability with coerced arguments.
    ///
    /// # Errors
    ///
    /// Any error is reported back to the model as text; it never aborts the
    /// surrounding turn.
    async fn invoke(&self, parameters: Parameters) -> ToolResult<String>;
}

/// Capability backed by an async closure.
///
/// # Examples
///
/// ```
/// use agent_primitives::{CapabilityDescriptor, ParameterSpec, ParameterType};
/// use agent_tools::{Capability, FnCapability, Parameters};
///
/// let descriptor = CapabilityDescriptor::builder("echo")
///     .description("Repeats its input")
///     .parameter(ParameterSpec::required("text", ParameterType::String, "Text to repeat"))
///     .build()
///     .unwrap();
/// let echo = FnCapability::new(descriptor, |params: Parameters| async move {
///     let text = params.get("text").and_then(|v| v.as_str()).unwrap_or_default();
///     Ok::<_, agent_tools::ToolError>(text.to_owned())
/// });
/// assert_eq!(echo.name(), "echo");
/// ```
pub struct FnCapability<F> {
    descriptor: CapabilityDescriptor,
    handler: F,
}

impl<F> FnCapability<F> {
    /// Wraps `handler` under the supplied descriptor.
    #[must_use]
    pub fn new(descriptor: CapabilityDescriptor, handler: F) -> Self {
        Self {
            descriptor,
            handler,
        }
    }
}

impl<F, Fut> FnCapability<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<String>> + Send + 'static,
{
    /// Wraps the capability for registration.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Capability> {
        Arc::new(self)
    }
}

impl<F> std::fmt::Debug for FnCapability<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCapability")
            .field("name", &self.descriptor.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult<String>> + Send,
{
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, parameters: Parameters) -> ToolResult<String> {
        (self.handler)(parameters).await
    }
}
