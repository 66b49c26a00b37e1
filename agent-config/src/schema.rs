use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::provider::{Credentials, Provider};

/// Settings for one agent, its model transport and its tool servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_name")]
    pub name: String,

    /// Model identifier; empty selects the provider default.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model provider.
    #[serde(default)]
    pub provider: Provider,

    /// Explicit API key; resolved from the environment when absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Explicit base URL; resolved from the environment when absent.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Base system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output token budget per model call.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// HTTP timeout for one model call, in seconds.
    #[serde(default = "default_timeout_secs", alias = "timeout")]
    pub timeout_secs: u64,

    /// Forces debug-level logging.
    #[serde(default)]
    pub debug: bool,

    /// Log level directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level", alias = "LOG_LEVEL")]
    pub log_level: String,

    /// Messages kept in the conversation history; `0` keeps everything.
    #[serde(default = "default_max_history_length", alias = "max_history")]
    pub max_history_length: usize,

    /// Tool-augmented rounds per call before the final answer is forced.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Streams model output incrementally.
    #[serde(default)]
    pub stream: bool,

    /// Shows the model's reasoning, when the provider returns any.
    #[serde(default = "default_show_reasoning")]
    pub show_reasoning: bool,

    /// Upper bound on listing one tool server's catalog, in seconds.
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,

    /// External tool servers registered at start-up.
    #[serde(default)]
    pub tool_servers: Vec<ToolServerConfig>,
}

fn default_name() -> String {
    "Assistant".to_owned()
}

fn default_model() -> String {
    "deepseek-chat".to_owned()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_max_history_length() -> usize {
    100
}

fn default_max_iterations() -> usize {
    3
}

fn default_show_reasoning() -> bool {
    true
}

fn default_discovery_timeout_secs() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            model: default_model(),
            provider: Provider::default(),
            api_key: None,
            base_url: None,
            system_prompt: None,
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            debug: false,
            log_level: default_log_level(),
            max_history_length: default_max_history_length(),
            max_iterations: default_max_iterations(),
            stream: false,
            show_reasoning: default_show_reasoning(),
            discovery_timeout_secs: default_discovery_timeout_secs(),
            tool_servers: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Model to request; the provider default when none is configured.
    #[must_use]
    pub fn effective_model(&self) -> &str {
        let model = self.model.trim();
        if model.is_empty() {
            self.provider.default_model()
        } else {
            model
        }
    }

    /// HTTP timeout for one model call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upper bound on one catalog discovery.
    #[must_use]
    pub const fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    /// Resolves credentials against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`](crate::ConfigError::MissingCredential)
    /// when no API key or base URL can be found.
    pub fn credentials(&self) -> ConfigResult<Credentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    /// Resolves credentials using the supplied variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`](crate::ConfigError::MissingCredential)
    /// when no API key or base URL can be found.
    pub fn credentials_with<F>(&self, lookup: F) -> ConfigResult<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.provider
            .resolve_credentials(self.api_key.as_deref(), self.base_url.as_deref(), lookup)
    }
}

/// An external tool server launched as a child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Prefix of the tools discovered on this server (`<name>_<tool>`).
    pub name: String,

    /// Command that starts the server.
    pub command: String,

    /// Arguments passed to the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the server.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Registers each discovered tool instead of the server as one tool.
    #[serde(default = "default_expand")]
    pub expand: bool,
}

fn default_expand() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.provider, Provider::DeepSeek);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_history_length, 100);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.discovery_timeout(), Duration::from_secs(30));
        assert!(!config.stream);
        assert!(config.tool_servers.is_empty());
    }

    #[test]
    fn empty_model_falls_back_to_provider_default() {
        let config = AgentConfig {
            model: "  ".into(),
            provider: Provider::OpenAi,
            ..AgentConfig::default()
        };
        assert_eq!(config.effective_model(), "gpt-3.5-turbo");
    }

    #[test]
    fn tool_server_defaults_to_expansion() {
        let server: ToolServerConfig = toml::from_str(
            "name = \"git\"\ncommand = \"uvx\"\nargs = [\"mcp-server-git\"]",
        )
        .unwrap();
        assert!(server.expand);
        assert_eq!(server.args, ["mcp-server-git"]);
        assert!(server.env.is_empty());
    }
}
