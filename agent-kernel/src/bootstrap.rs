//! Builds agents from an [`AgentConfig`].

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use agent_adapters::openai::{OpenAiAdapter, OpenAiConfig};
use agent_adapters::traits::ModelAdapter;
use agent_config::{AgentConfig, ToolServerConfig};
use agent_memory::HistoryConfig;
use agent_tools::remote::{RemoteToolset, StdioToolSource};
use agent_tools::{DiscoveryConfig, Registration};
use tracing::info;

use crate::agent::{Agent, AgentBuilder, InferenceOptions, OutputSink};
use crate::error::{KernelError, KernelResult};

/// Builds the OpenAI-compatible transport described by `config`.
///
/// # Errors
///
/// Returns [`KernelError::Configuration`] when credentials cannot be
/// resolved or the endpoint is invalid.
pub fn adapter_from_config(config: &AgentConfig) -> KernelResult<Arc<dyn ModelAdapter>> {
    let credentials = config.credentials()?;
    let mut openai = OpenAiConfig::new(config.effective_model())
        .with_provider(config.provider.as_str())
        .with_base_url(&credentials.base_url)
        .map_err(|err| KernelError::configuration(err.to_string()))?
        .with_api_key(credentials.api_key)
        .with_default_temperature(config.temperature)
        .with_timeout(config.timeout())
        .with_reasoning(config.show_reasoning);
    if let Some(max_tokens) = config.max_tokens {
        openai = openai.with_default_max_tokens(max_tokens);
    }

    let adapter =
        OpenAiAdapter::new(openai).map_err(|err| KernelError::configuration(err.to_string()))?;
    Ok(Arc::new(adapter))
}

/// Maps a configured history length onto a retention policy; `0` keeps
/// everything.
#[must_use]
pub fn history_config(max_history_length: usize) -> HistoryConfig {
    NonZeroUsize::new(max_history_length)
        .map_or_else(HistoryConfig::unbounded, HistoryConfig::bounded)
}

/// Applies the agent-level settings of `config` to a builder.
#[must_use]
pub fn builder_from_config(config: &AgentConfig, adapter: Arc<dyn ModelAdapter>) -> AgentBuilder {
    let mut builder = Agent::builder(adapter)
        .name(config.name.clone())
        .max_iterations(config.max_iterations)
        .history(history_config(config.max_history_length))
        .options(InferenceOptions {
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            stream: config.stream,
        })
        .discovery(DiscoveryConfig::with_timeout(config.discovery_timeout()));
    if let Some(prompt) = config.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        builder = builder.system_prompt(prompt);
    }
    builder
}

/// Registers every configured tool server with the agent.
///
/// Servers flagged `expand` are discovered now and contribute one tool per
/// remote tool; a server that cannot be reached contributes nothing.
///
/// # Errors
///
/// Returns [`KernelError::Configuration`] when a server name cannot be used
/// as a tool name.
pub async fn register_tool_servers(
    agent: &mut Agent,
    servers: &[ToolServerConfig],
    request_timeout: Duration,
) -> KernelResult<Vec<Registration>> {
    let mut registrations = Vec::with_capacity(servers.len());
    for server in servers {
        let source = StdioToolSource::new(server.name.as_str(), server.command.as_str())
            .with_args(server.args.iter().cloned())
            .with_env(server.env.iter().map(|(key, value)| (key.clone(), value.clone())))
            .with_request_timeout(request_timeout);
        let toolset = RemoteToolset::new(server.name.as_str(), Arc::new(source))
            .map_err(|err| {
                KernelError::configuration(format!("tool server `{}`: {err}", server.name))
            })?
            .with_expansion(server.expand);

        let registration = agent.register_capability(toolset.shared(), server.expand).await;
        info!(server = %server.name, tools = ?registration.names(), "tool server registered");
        registrations.push(registration);
    }
    Ok(registrations)
}

/// Builds a ready agent: transport, settings, output sink and tool servers.
///
/// # Errors
///
/// Returns [`KernelError::Configuration`] for unusable settings.
pub async fn agent_from_config(
    config: &AgentConfig,
    output: Arc<dyn OutputSink>,
) -> KernelResult<Agent> {
    let adapter = adapter_from_config(config)?;
    let mut agent = builder_from_config(config, adapter).output_sink(output).build();
    register_tool_servers(&mut agent, &config.tool_servers, config.timeout()).await?;
    Ok(agent)
}
