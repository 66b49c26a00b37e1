//! Global `tracing` subscriber bootstrap for binaries.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Settings used by [`init_tracing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_level: String,
    debug: bool,
    with_target: bool,
}

impl TelemetryConfig {
    /// Creates settings for the supplied level directive (e.g. `info`).
    #[must_use]
    pub fn new(log_level: impl Into<String>) -> Self {
        Self {
            log_level: log_level.into(),
            debug: false,
            with_target: false,
        }
    }

    /// Forces `debug` verbosity regardless of the configured level.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Includes the event target (module path) in every line.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Filter directive that will be installed when `RUST_LOG` is unset.
    #[must_use]
    pub fn directive(&self) -> String {
        if self.debug {
            "debug".to_owned()
        } else {
            self.log_level.to_lowercase()
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised")]
    AlreadyInitialised,
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.directive();
    EnvFilter::try_new(&directive).map_err(|err| TelemetryError::InvalidFilter {
        directive,
        reason: err.to_string(),
    })
}

/// Installs a formatted `tracing` subscriber writing to standard error.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for an unparsable level and
/// [`TelemetryError::AlreadyInitialised`] when called twice.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_overrides_level() {
        let config = TelemetryConfig::new("WARN");
        assert_eq!(config.directive(), "warn");
        assert_eq!(config.with_debug(true).directive(), "debug");
    }

    #[test]
    fn second_initialisation_is_rejected() {
        let config = TelemetryConfig::default();
        let first = init_tracing(&config);
        let second = init_tracing(&config);
        // Another test binary may already own the global subscriber.
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::AlreadyInitialised)));
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialised)));
    }
}
