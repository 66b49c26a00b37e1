use agent_adapters::traits::AdapterError;
use agent_config::ConfigError;
use agent_prompts::TemplateError;
use thiserror::Error;

use crate::turn::TurnError;

/// Result alias used by the kernel.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors that end a top-level call or prevent an agent from being built.
///
/// Tool failures never appear here; they are reported to the model as
/// ordinary conversation content.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Settings are missing or unusable. Raised at construction and never
    /// retried.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Human readable description.
        reason: String,
    },

    /// The model transport failed; the call is aborted without retry.
    #[error("model transport failed: {source}")]
    Transport {
        /// Error reported by the adapter.
        #[from]
        source: AdapterError,
    },

    /// A built-in invariant of the loop was broken.
    #[error("internal error: {reason}")]
    Internal {
        /// Human readable description.
        reason: String,
    },
}

impl KernelError {
    /// Convenience constructor for [`KernelError::Configuration`].
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns `true` for transport failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<ConfigError> for KernelError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

impl From<TemplateError> for KernelError {
    fn from(err: TemplateError) -> Self {
        Self::Internal {
            reason: format!("system prompt template: {err}"),
        }
    }
}

impl From<TurnError> for KernelError {
    fn from(err: TurnError) -> Self {
        Self::Internal {
            reason: err.to_string(),
        }
    }
}
