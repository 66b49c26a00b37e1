//! Adapter for OpenAI-compatible chat-completions endpoints.
//!
//! Works against the OpenAI API itself as well as compatible providers such
//! as `DeepSeek`. Responses are delivered either as one chunk or, when the
//! request asks for streaming, decoded incrementally from server-sent events.

use std::collections::VecDeque;
use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use hyper::body::to_bytes;
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Request, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client};
use crate::sse::{SseDecoder, SseEvent};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter, PromptMessage,
};

/// Base URL of the official `OpenAI` API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Header emitted before the first reasoning delta.
pub const THINKING_HEADER: &str = "\nThinking...\n";

/// Header emitted before the first answer delta once reasoning was shown.
pub const ANSWER_HEADER: &str = "\n\nAnswer:\n";

/// Configuration for the [`OpenAiAdapter`].
#[derive(Clone)]
pub struct OpenAiConfig {
    provider: String,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
    surface_reasoning: bool,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a configuration for the official API and the supplied model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider: "openai".to_owned(),
            api_key: None,
            model: model.into(),
            base_url: format!("{OPENAI_BASE_URL}/"),
            timeout: Duration::from_secs(60),
            default_temperature: None,
            default_max_tokens: None,
            surface_reasoning: false,
        }
    }

    /// Labels the provider in metadata and logs.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Overrides the base URL; `chat/completions` is appended to it.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the default output token budget used when requests omit it.
    #[must_use]
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = Some(max_tokens);
        self
    }

    /// Sets the HTTP timeout; while streaming it bounds each read.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Emits the model's reasoning as [`ChunkKind::Reasoning`] chunks framed
    /// by [`THINKING_HEADER`] and [`ANSWER_HEADER`].
    ///
    /// [`ChunkKind::Reasoning`]: crate::traits::ChunkKind::Reasoning
    #[must_use]
    pub fn with_reasoning(mut self, surface: bool) -> Self {
        self.surface_reasoning = surface;
        self
    }

    /// Returns the normalised base URL (always ending in `/`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Adapter that calls an OpenAI-compatible API over HTTP(S).
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
    surface_reasoning: bool,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("provider", &self.metadata.provider())
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing or
    /// the endpoint cannot be formed.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AdapterError::configuration(format!(
                    "{} adapter requires an API key",
                    config.provider
                ))
            })?;

        let endpoint = format!("{}chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid endpoint: {err}")))?;

        Ok(Self {
            client: build_https_client(config.timeout),
            endpoint,
            metadata: AdapterMetadata::new(config.provider, config.model),
            api_key,
            timeout: config.timeout,
            default_temperature: config.default_temperature,
            default_max_tokens: config.default_max_tokens,
            surface_reasoning: config.surface_reasoning,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages: request.messages().iter().map(map_prompt_message).collect(),
            temperature: request.temperature().or(self.default_temperature),
            max_tokens: request.max_output_tokens().or(self.default_max_tokens),
            stream: request.stream(),
        }
    }

    async fn send(&self, payload: &ChatCompletionRequest) -> AdapterResult<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode request: {err}"))
        })?;

        let accept = if payload.stream {
            "text/event-stream"
        } else {
            "application/json"
        };
        let request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

        let response = timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| {
                AdapterError::transport(format!(
                    "{} request timed out after {:?}",
                    self.metadata.provider(),
                    self.timeout
                ))
            })?
            .map_err(|err| {
                AdapterError::transport(format!(
                    "{} request failed: {err}",
                    self.metadata.provider()
                ))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AdapterError::RateLimited { retry_after });
        }

        let bytes = timeout(self.timeout, to_bytes(response.into_body()))
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        Err(AdapterError::response(format!(
            "{} returned {status}: {}",
            self.metadata.provider(),
            String::from_utf8_lossy(&bytes)
        )))
    }

    async fn collect(&self, response: hyper::Response<Body>) -> AdapterResult<AdapterStream> {
        let bytes = timeout(self.timeout, to_bytes(response.into_body()))
            .await
            .map_err(|_| AdapterError::transport("timed out reading response body"))?
            .map_err(|err| AdapterError::transport(format!("failed to read response: {err}")))?;

        let response: ChatCompletionResponse = serde_json::from_slice(&bytes)
            .map_err(|err| AdapterError::response(format!("failed to decode response: {err}")))?;

        let message = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message)
            .unwrap_or_default();

        let mut chunks = Vec::with_capacity(2);
        if self.surface_reasoning {
            if let Some(reasoning) = message.reasoning_content.filter(|r| !r.is_empty()) {
                chunks.push(InferenceChunk::reasoning(format!(
                    "{THINKING_HEADER}{reasoning}{ANSWER_HEADER}"
                )));
            }
        }
        chunks.push(InferenceChunk::new(message.content.unwrap_or_default(), true));

        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }

    fn stream_events(&self, response: hyper::Response<Body>) -> AdapterStream {
        let state = StreamState {
            body: response.into_body(),
            read_timeout: self.timeout,
            decoder: SseDecoder::default(),
            framer: ReasoningFramer::new(self.surface_reasoning),
            pending: VecDeque::new(),
            finished: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Some((item, state));
                }
                if state.finished {
                    return None;
                }
                state.pump().await;
            }
        }))
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        debug!(
            provider = %self.metadata.provider(),
            model = %payload.model,
            messages = payload.messages.len(),
            stream = payload.stream,
            "sending chat completion"
        );

        let response = self.send(&payload).await?;
        if payload.stream {
            Ok(self.stream_events(response))
        } else {
            self.collect(response).await
        }
    }
}

struct StreamState {
    body: Body,
    read_timeout: Duration,
    decoder: SseDecoder,
    framer: ReasoningFramer,
    pending: VecDeque<AdapterResult<InferenceChunk>>,
    finished: bool,
}

impl StreamState {
    async fn pump(&mut self) {
        match timeout(self.read_timeout, self.body.next()).await {
            Err(_) => self.fail(AdapterError::transport("stream stalled")),
            Ok(Some(Err(err))) => {
                self.fail(AdapterError::transport(format!("stream broken: {err}")));
            }
            Ok(Some(Ok(bytes))) => {
                for event in self.decoder.push(&bytes) {
                    self.handle(event);
                }
            }
            Ok(None) => {
                if let Some(event) = self.decoder.finish() {
                    self.handle(event);
                }
                self.complete();
            }
        }
    }

    fn handle(&mut self, event: SseEvent) {
        if self.finished {
            return;
        }
        let payload = match event {
            SseEvent::Done => return self.complete(),
            SseEvent::Data(payload) => payload,
        };
        let chunk: StreamChunk = match serde_json::from_str(&payload) {
            Ok(chunk) => chunk,
            Err(err) => {
                return self.fail(AdapterError::response(format!(
                    "failed to decode stream chunk: {err}"
                )));
            }
        };
        if let Some(error) = chunk.error {
            return self.fail(AdapterError::response(error.message));
        }
        for choice in chunk.choices {
            let Some(delta) = choice.delta else { continue };
            let framed = self.framer.frame(delta.reasoning_content, delta.content);
            self.pending.extend(framed.into_iter().map(Ok));
        }
    }

    fn complete(&mut self) {
        if !self.finished {
            self.pending.push_back(Ok(InferenceChunk::new("", true)));
            self.finished = true;
        }
    }

    fn fail(&mut self, err: AdapterError) {
        self.pending.push_back(Err(err));
        self.finished = true;
    }
}

/// Inserts the reasoning and answer headers around streamed deltas.
#[derive(Debug)]
struct ReasoningFramer {
    surface: bool,
    thinking_started: bool,
    answer_started: bool,
}

impl ReasoningFramer {
    fn new(surface: bool) -> Self {
        Self {
            surface,
            thinking_started: false,
            answer_started: false,
        }
    }

    fn frame(
        &mut self,
        reasoning: Option<String>,
        content: Option<String>,
    ) -> Vec<InferenceChunk> {
        let mut out = Vec::new();
        if let Some(reasoning) = reasoning.filter(|r| self.surface && !r.is_empty()) {
            if !self.thinking_started {
                self.thinking_started = true;
                out.push(InferenceChunk::reasoning(THINKING_HEADER));
            }
            out.push(InferenceChunk::reasoning(reasoning));
        }
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            if self.thinking_started && !self.answer_started {
                self.answer_started = true;
                out.push(InferenceChunk::reasoning(ANSWER_HEADER));
            }
            out.push(InferenceChunk::new(content, false));
        }
        out
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage {
    OpenAiMessage {
        role: message.role().as_str(),
        content: message.content().to_owned(),
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid base URL: {err}")))?;
    Ok(base)
}
