//! Shared error definitions for agent primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the agent runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating agent primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided agent identifier could not be parsed.
    #[error("invalid agent id: {source}")]
    InvalidAgentId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Capability descriptor failed validation.
    #[error("invalid capability `{name}`: {reason}")]
    InvalidCapability {
        /// Name of the offending capability (may be empty).
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Two parameters of one descriptor share a name.
    #[error("capability `{capability}` declares parameter `{parameter}` more than once")]
    DuplicateParameter {
        /// Owning capability name.
        capability: String,
        /// Repeated parameter name.
        parameter: String,
    },

    /// Message role string was not recognised.
    #[error("unknown message role `{0}`")]
    UnknownRole(String),
}
