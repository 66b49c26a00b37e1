//! Time-bounded expansion of dynamic capability catalogs.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::capability::{Capability, ToolError};

const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings applied when expanding a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    timeout: Duration,
}

impl DiscoveryConfig {
    /// Uses the supplied discovery timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Upper bound on a single expansion.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_DISCOVERY_TIMEOUT)
    }
}

/// Reasons an expansion produced nothing.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The catalog did not answer in time.
    #[error("discovery for `{capability}` timed out after {after:?}")]
    TimedOut {
        /// Expandable capability name.
        capability: String,
        /// Configured bound.
        after: Duration,
    },

    /// The discovery task panicked or was cancelled.
    #[error("discovery task for `{capability}` aborted: {reason}")]
    Aborted {
        /// Expandable capability name.
        capability: String,
        /// Join error text.
        reason: String,
    },

    /// The capability reported an error while listing.
    #[error("discovery for `{capability}` failed: {source}")]
    Source {
        /// Expandable capability name.
        capability: String,
        /// Underlying tool error.
        #[source]
        source: ToolError,
    },
}

/// Runs [`Capability::expand`] on its own task, bounded by the configured
/// timeout.
///
/// The spawned task is aborted on timeout, which drops any tool process it
/// owns.
///
/// # Errors
///
/// Returns a [`DiscoveryError`] describing why no capabilities were produced.
pub async fn discover(
    capability: Arc<dyn Capability>,
    config: &DiscoveryConfig,
) -> Result<Vec<Arc<dyn Capability>>, DiscoveryError> {
    let name = capability.name().to_owned();
    let after = config.timeout();
    debug!(capability = %name, ?after, "expanding capability");

    let mut task = tokio::spawn(async move { capability.expand().await });
    match tokio::time::timeout(after, &mut task).await {
        Err(_) => {
            task.abort();
            Err(DiscoveryError::TimedOut {
                capability: name,
                after,
            })
        }
        Ok(Err(join)) => Err(DiscoveryError::Aborted {
            capability: name,
            reason: join.to_string(),
        }),
        Ok(Ok(Err(source))) => Err(DiscoveryError::Source {
            capability: name,
            source,
        }),
        Ok(Ok(Ok(children))) => Ok(children),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Parameters, ToolResult};
    use agent_primitives::CapabilityDescriptor;
    use async_trait::async_trait;

    struct Slow(CapabilityDescriptor);

    #[async_trait]
    impl Capability for Slow {
        fn descriptor(&self) -> &CapabilityDescriptor {
            &self.0
        }

        fn is_expandable(&self) -> bool {
            true
        }

        async fn expand(&self) -> ToolResult<Vec<Arc<dyn Capability>>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn invoke(&self, _: Parameters) -> ToolResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(DiscoveryConfig::default().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn sub_second_timeout_is_kept() {
        let config = DiscoveryConfig::with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_discovery_times_out() {
        let slow = Arc::new(Slow(CapabilityDescriptor::builder("slow").build().unwrap()));
        let config = DiscoveryConfig::with_timeout(Duration::from_secs(2));

        let err = discover(slow, &config).await.err().expect("timeout");
        assert!(matches!(
            err,
            DiscoveryError::TimedOut { ref capability, .. } if capability == "slow"
        ));
    }
}
