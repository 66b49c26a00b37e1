use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config from {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document or one of its tables is malformed.
    #[error("failed to parse config: {source}")]
    Parse {
        /// Underlying TOML error.
        #[from]
        source: toml::de::Error,
    },

    /// A setting has a value that cannot be used.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        /// Setting or environment variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The provider is not one of the supported names.
    #[error("unsupported provider `{0}` (expected openai, deepseek or custom)")]
    UnknownProvider(String),

    /// No API key or base URL could be resolved for the provider.
    #[error("no {field} configured for provider `{provider}`")]
    MissingCredential {
        /// Provider name.
        provider: String,
        /// `api key` or `base url`.
        field: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}
