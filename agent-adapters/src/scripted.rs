//! Adapter that replays canned responses.
//!
//! Useful for exercising the orchestration loop without a network: every
//! request is recorded, and each call consumes the next scripted reply.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter,
};

/// Characters per chunk when a streamed reply is split.
const STREAM_CHUNK_CHARS: usize = 8;

/// One scripted reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Answer with the given text.
    Text(String),
    /// Fail with a transport error carrying the given reason.
    TransportFailure(String),
}

/// Scripted [`ModelAdapter`] for tests and offline demos.
#[derive(Debug)]
pub struct ScriptedAdapter {
    metadata: AdapterMetadata,
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<ScriptedReply>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedAdapter {
    /// Replies with `replies` in order, then fails once they run out.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metadata: AdapterMetadata::new("scripted", "scripted"),
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| ScriptedReply::Text(reply.into()))
                    .collect(),
            ),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replays a mixed script of texts and failures.
    #[must_use]
    pub fn from_script(script: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(script.into_iter().collect()),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Answers every call with the same text.
    #[must_use]
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(ScriptedReply::Text(reply.into())),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Copies of every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().expect("scripted adapter poisoned").clone()
    }

    /// Number of calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a previous panic.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("scripted adapter poisoned").len()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let mut replies = self.replies.lock().expect("scripted adapter poisoned");
        replies.pop_front().or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let streaming = request.stream();
        self.requests
            .lock()
            .expect("scripted adapter poisoned")
            .push(request);

        let text = match self.next_reply() {
            Some(ScriptedReply::Text(text)) => text,
            Some(ScriptedReply::TransportFailure(reason)) => {
                return Err(AdapterError::transport(reason));
            }
            None => return Err(AdapterError::transport("script exhausted")),
        };

        let chunks = if streaming {
            split_for_stream(&text)
        } else {
            vec![InferenceChunk::new(text, true)]
        };
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

fn split_for_stream(text: &str) -> Vec<InferenceChunk> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks: Vec<InferenceChunk> = chars
        .chunks(STREAM_CHUNK_CHARS)
        .map(|piece| InferenceChunk::new(piece.iter().collect::<String>(), false))
        .collect();
    chunks.push(InferenceChunk::new("", true));
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PromptMessage;

    fn request(stream: bool) -> InferenceRequest {
        InferenceRequest::new(vec![PromptMessage::user("hi")])
            .unwrap()
            .with_stream(stream)
    }

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let adapter = ScriptedAdapter::new(["one", "two"]);
        assert_eq!(adapter.complete(request(false)).await.unwrap(), "one");
        assert_eq!(adapter.complete(request(false)).await.unwrap(), "two");
        assert!(matches!(
            adapter.complete(request(false)).await,
            Err(AdapterError::Transport { .. })
        ));
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn streamed_reply_reassembles() {
        let adapter = ScriptedAdapter::repeating("a reply longer than one chunk, 是的");
        assert_eq!(
            adapter.complete(request(true)).await.unwrap(),
            "a reply longer than one chunk, 是的"
        );
        assert!(adapter.requests()[0].stream());
    }

    #[tokio::test]
    async fn scripted_failure_is_a_transport_error() {
        let adapter =
            ScriptedAdapter::from_script([ScriptedReply::TransportFailure("down".into())]);
        let err = adapter.complete(request(false)).await.unwrap_err();
        assert_eq!(err.to_string(), "adapter transport error: down");
    }
}
