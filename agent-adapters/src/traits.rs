//! Shared model adapter traits and data structures.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use agent_primitives::{MessageRole, PromptMessage};

/// Result alias used by model adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Streaming response emitted by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Error type shared by adapter implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter is misconfigured or missing credentials.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request was invalid for the target model.
    #[error("invalid inference request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Network failure, timeout, or broken stream.
    #[error("adapter transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The provider rejected the request due to rate limiting.
    #[error("adapter rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The provider answered with an error status or an undecodable body.
    #[error("adapter response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for response failures.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a model adapter instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: String,
    model: String,
}

impl AdapterMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g. `deepseek`).
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request submitted to a model adapter.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InferenceRequest {
    messages: Vec<PromptMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(default)]
    stream: bool,
}

impl InferenceRequest {
    /// Creates a request with the supplied messages, system message first.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] if the message list is empty.
    pub fn new(messages: Vec<PromptMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request(
                "inference request requires at least one message",
            ));
        }

        Ok(Self {
            messages,
            max_output_tokens: None,
            temperature: None,
            stream: false,
        })
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Requests incremental delivery of the response.
    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Returns the prompt messages.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Whether the caller consumes the response incrementally.
    #[must_use]
    pub const fn stream(&self) -> bool {
        self.stream
    }
}

/// What a chunk's text belongs to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Part of the answer.
    #[default]
    Content,
    /// Model reasoning or the headers framing it; never part of the answer.
    Reasoning,
}

/// Streaming chunk returned by the adapter.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct InferenceChunk {
    /// Partial token delta emitted by the provider.
    pub delta: String,
    /// Whether the generation is complete.
    pub done: bool,
    /// Whether the delta is answer text or reasoning.
    #[serde(default)]
    pub kind: ChunkKind,
}

impl InferenceChunk {
    /// Creates a new answer chunk.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
            kind: ChunkKind::Content,
        }
    }

    /// Creates a reasoning chunk.
    #[must_use]
    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            done: false,
            kind: ChunkKind::Reasoning,
        }
    }

    /// Returns `true` for answer text.
    #[must_use]
    pub fn is_content(&self) -> bool {
        self.kind == ChunkKind::Content
    }
}

/// Trait implemented by all model adapters.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Returns basic metadata describing the adapter instance.
    fn metadata(&self) -> &AdapterMetadata;

    /// Executes the inference request, returning a streaming response.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] when the request cannot be sent.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;

    /// Executes the request and concatenates the answer text.
    ///
    /// Reasoning chunks are dropped.
    ///
    /// # Errors
    ///
    /// Propagates the first error of the request or of the stream.
    async fn complete(&self, request: InferenceRequest) -> AdapterResult<String> {
        let stream = self.infer(request).await?;
        drain_answer(stream, |_| {}).await
    }
}

/// Consumes a response stream up to its final chunk and returns the answer
/// text.
///
/// Every chunk, reasoning included, is shown to `observe` before the next
/// one is read; only content chunks contribute to the answer.
///
/// # Errors
///
/// Propagates the first error yielded by the stream.
pub async fn drain_answer<F>(mut stream: AdapterStream, mut observe: F) -> AdapterResult<String>
where
    F: FnMut(&InferenceChunk) + Send,
{
    let mut answer = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        observe(&chunk);
        if chunk.is_content() {
            answer.push_str(&chunk.delta);
        }
        if chunk.done {
            break;
        }
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct Fixed(AdapterMetadata, Vec<InferenceChunk>);

    #[async_trait]
    impl ModelAdapter for Fixed {
        fn metadata(&self) -> &AdapterMetadata {
            &self.0
        }

        async fn infer(&self, _: InferenceRequest) -> AdapterResult<AdapterStream> {
            Ok(Box::pin(stream::iter(self.1.clone().into_iter().map(Ok))))
        }
    }

    #[test]
    fn validates_request_messages() {
        let err = InferenceRequest::new(Vec::new()).expect_err("messages required");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn builds_request() {
        let request = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "ping")])
            .unwrap()
            .with_max_output_tokens(256)
            .with_temperature(0.7)
            .with_stream(true);

        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.max_output_tokens(), Some(256));
        assert_eq!(request.temperature(), Some(0.7));
        assert!(request.stream());
    }

    #[tokio::test]
    async fn complete_joins_content_and_skips_reasoning() {
        let adapter = Fixed(
            AdapterMetadata::new("test", "fixed"),
            vec![
                InferenceChunk::reasoning("\nThinking...\n"),
                InferenceChunk::reasoning("hmm"),
                InferenceChunk::new("Hel", false),
                InferenceChunk::new("lo", true),
                InferenceChunk::new("ignored", true),
            ],
        );
        let request = InferenceRequest::new(vec![PromptMessage::user("hi")]).unwrap();
        assert_eq!(adapter.complete(request).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn drain_shows_every_chunk_up_to_done() {
        let chunks = vec![
            InferenceChunk::reasoning("plan"),
            InferenceChunk::new("a", false),
            InferenceChunk::new("b", true),
            InferenceChunk::new("late", false),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks.into_iter().map(Ok)));

        let mut seen = Vec::new();
        let answer = drain_answer(stream, |chunk| {
            seen.push((chunk.is_content(), chunk.delta.clone()));
        })
        .await
        .unwrap();

        assert_eq!(answer, "ab");
        assert_eq!(
            seen,
            [(false, "plan".to_owned()), (true, "a".to_owned()), (true, "b".to_owned())]
        );
    }

    #[tokio::test]
    async fn drain_stops_at_first_error() {
        let items = vec![
            Ok(InferenceChunk::new("partial", false)),
            Err(AdapterError::transport("reset")),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(items));
        let err = drain_answer(stream, |_| {}).await.unwrap_err();
        assert!(matches!(err, AdapterError::Transport { .. }));
    }
}
