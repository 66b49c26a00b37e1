//! The agent: one conversation thread driving the orchestration loop.

use std::fmt;
use std::sync::Arc;

use agent_adapters::traits::{InferenceRequest, ModelAdapter, PromptMessage, drain_answer};
use agent_memory::{ConversationHistory, HistoryConfig};
use agent_primitives::AgentId;
use agent_prompts::{DEFAULT_SYSTEM_PROMPT, SystemPrompt};
use agent_telemetry::{AgentEvent, EventSink, TracingSink};
use agent_tools::{
    Capability, CapabilityRegistry, DiscoveryConfig, Registration, parse_directives,
    strip_directives,
};
use tracing::{debug, info, warn};

use crate::dispatch::dispatch;
use crate::error::KernelResult;
use crate::turn::{Turn, TurnEvent, TurnPhase};

/// Default bound on tool-augmented rounds per call.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Instruction appended after the tool results of a round.
pub const FINAL_ANSWER_INSTRUCTION: &str =
    "Please provide your final answer based on the tool results above.";

/// Receives model output as it is produced.
///
/// With streaming enabled every delta is delivered as it arrives; otherwise
/// the whole response arrives in one call.
pub trait OutputSink: Send + Sync {
    /// Answer text.
    fn on_chunk(&self, text: &str);

    /// Reasoning text, including the headers framing it.
    fn on_reasoning(&self, text: &str) {
        self.on_chunk(text);
    }

    /// Called once a model response is complete.
    fn on_response_end(&self) {}
}

/// Output sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl OutputSink for NullOutput {
    fn on_chunk(&self, _text: &str) {}
}

/// Per-request options forwarded to the model transport.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InferenceOptions {
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Output token budget override.
    pub max_tokens: Option<u32>,
    /// Consume the response as a stream.
    pub stream: bool,
}

/// A tool-augmented conversational agent.
///
/// Owns its capability registry and conversation history; the model
/// transport is shared. Calls on one agent must be serialised, which
/// `run(&mut self, ..)` enforces.
pub struct Agent {
    id: AgentId,
    name: String,
    adapter: Arc<dyn ModelAdapter>,
    registry: CapabilityRegistry,
    history: ConversationHistory,
    system_prompt: SystemPrompt,
    max_iterations: usize,
    options: InferenceOptions,
    events: Arc<dyn EventSink>,
    output: Arc<dyn OutputSink>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.adapter.metadata();
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .field("tools", &self.registry.names())
            .field("history_len", &self.history.len())
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Starts building an agent around the supplied model transport.
    #[must_use]
    pub fn builder(adapter: Arc<dyn ModelAdapter>) -> AgentBuilder {
        AgentBuilder::new(adapter)
    }

    /// Identifier of this conversation thread.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered capabilities.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Conversation transcript.
    #[must_use]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Clears the conversation transcript.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Bound on tool-augmented rounds per call.
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Registers a capability without discovery.
    pub fn add_capability(&mut self, capability: Arc<dyn Capability>) -> Registration {
        self.registry.add(capability)
    }

    /// Registers a capability, expanding it when `expand` is set and the
    /// capability supports it.
    pub async fn register_capability(
        &mut self,
        capability: Arc<dyn Capability>,
        expand: bool,
    ) -> Registration {
        self.registry.register(capability, expand).await
    }

    /// Answers one user input, running tools as the model requests them.
    ///
    /// Exactly one user/assistant pair is appended to the history when the
    /// call succeeds; nothing is appended when it fails.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Transport`](crate::KernelError::Transport)
    /// when the model transport fails. Tool failures are never errors.
    pub async fn run(&mut self, input: &str) -> KernelResult<String> {
        self.events.emit(AgentEvent::TurnStarted {
            agent: self.id.short(),
            input_chars: input.chars().count(),
        });

        let mut turn = Turn::new(self.max_iterations);
        let mut messages = self.compose(input)?;

        let answer = loop {
            turn.transition(TurnEvent::Composed)?;

            let forced = turn.is_forced();
            if forced {
                self.events.emit(AgentEvent::IterationLimitReached {
                    max_iterations: self.max_iterations,
                });
            }
            self.events.emit(AgentEvent::ModelCalled {
                round: turn.round(),
                forced,
                streaming: self.options.stream,
            });

            let response = self.call_model(&messages).await?;
            if turn.transition(TurnEvent::Responded)?.is_done() {
                break response;
            }

            if parse_directives(&response).next().is_none() {
                turn.transition(TurnEvent::NoDirectives)?;
                break response;
            }

            let directives: Vec<_> = parse_directives(&response).collect();
            self.events.emit(AgentEvent::DirectivesParsed {
                round: turn.model_calls(),
                count: directives.len(),
            });
            turn.transition(TurnEvent::DirectivesFound)?;

            let mut results = Vec::with_capacity(directives.len());
            for directive in &directives {
                let report = dispatch(&self.registry, directive, self.events.as_ref()).await;
                turn.record_tool_call();
                results.push(report.text().to_owned());
            }

            messages.push(PromptMessage::assistant(strip_directives(
                &response,
                &directives,
            )));
            messages.push(PromptMessage::user(format!(
                "{}\n\n{FINAL_ANSWER_INSTRUCTION}",
                results.join("\n\n")
            )));
            turn.transition(TurnEvent::Dispatched)?;
        };

        debug_assert_eq!(turn.phase(), TurnPhase::Done);
        self.history.record_exchange(input, answer.as_str());
        self.events.emit(AgentEvent::TurnCompleted {
            model_calls: turn.model_calls(),
            tool_calls: turn.tool_calls(),
        });
        info!(
            agent = %self.id,
            model_calls = turn.model_calls(),
            tool_calls = turn.tool_calls(),
            "call completed"
        );
        Ok(answer)
    }

    /// The message list for a new input: system prompt, history, input.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in tool-usage template is broken.
    pub fn compose(&self, input: &str) -> KernelResult<Vec<PromptMessage>> {
        let descriptions = (!self.registry.is_empty()).then(|| self.registry.describe_all());
        let system = self.system_prompt.compose(descriptions.as_deref())?;

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(PromptMessage::system(system));
        messages.extend(self.history.iter().cloned());
        messages.push(PromptMessage::user(input));
        Ok(messages)
    }

    async fn call_model(&self, messages: &[PromptMessage]) -> KernelResult<String> {
        let mut request =
            InferenceRequest::new(messages.to_vec())?.with_stream(self.options.stream);
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_output_tokens(max_tokens);
        }

        let result = self.collect_response(request).await;
        self.output.on_response_end();
        result.inspect_err(|err| {
            warn!(agent = %self.id, error = %err, "model call failed");
            self.events.emit(AgentEvent::TransportFailed {
                reason: err.to_string(),
            });
        })
    }

    async fn collect_response(&self, request: InferenceRequest) -> KernelResult<String> {
        let stream = self.adapter.infer(request).await?;
        let output = self.output.as_ref();
        let response = drain_answer(stream, |chunk| {
            if chunk.is_content() {
                output.on_chunk(&chunk.delta);
            } else {
                output.on_reasoning(&chunk.delta);
            }
        })
        .await?;
        debug!(agent = %self.id, response_chars = response.chars().count(), "model responded");
        Ok(response)
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    adapter: Arc<dyn ModelAdapter>,
    id: AgentId,
    name: String,
    system_prompt: String,
    max_iterations: usize,
    history: HistoryConfig,
    options: InferenceOptions,
    discovery: DiscoveryConfig,
    events: Arc<dyn EventSink>,
    output: Arc<dyn OutputSink>,
}

impl fmt::Debug for AgentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("name", &self.name)
            .field("max_iterations", &self.max_iterations)
            .field("history", &self.history)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AgentBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(adapter: Arc<dyn ModelAdapter>) -> Self {
        Self {
            adapter,
            id: AgentId::random(),
            name: "Assistant".to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history: HistoryConfig::unbounded(),
            options: InferenceOptions::default(),
            discovery: DiscoveryConfig::default(),
            events: Arc::new(TracingSink),
            output: Arc::new(NullOutput),
        }
    }

    /// Sets the agent identifier.
    #[must_use]
    pub fn id(mut self, id: AgentId) -> Self {
        self.id = id;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the base system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the bound on tool-augmented rounds per call.
    #[must_use]
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the history retention policy.
    #[must_use]
    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    /// Sets the per-request inference options.
    #[must_use]
    pub fn options(mut self, options: InferenceOptions) -> Self {
        self.options = options;
        self
    }

    /// Bounds catalog discovery during registration.
    #[must_use]
    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Routes runtime events to the supplied sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Routes model output to the supplied sink.
    #[must_use]
    pub fn output_sink(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// Builds the agent with an empty registry and history.
    #[must_use]
    pub fn build(self) -> Agent {
        let registry = CapabilityRegistry::new()
            .with_event_sink(Arc::clone(&self.events))
            .with_discovery_config(self.discovery);
        debug!(agent = %self.id, name = %self.name, "agent created");

        Agent {
            id: self.id,
            name: self.name,
            adapter: self.adapter,
            registry,
            history: ConversationHistory::with_config(self.history),
            system_prompt: SystemPrompt::new(self.system_prompt),
            max_iterations: self.max_iterations,
            options: self.options,
            events: self.events,
            output: self.output,
        }
    }
}
