//! Ordered transcript of role-tagged messages kept across turns.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use agent_primitives::{MessageRole, PromptMessage};
use serde::Deserialize;
use tracing::debug;

/// Configuration for the conversation history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    max_messages: Option<NonZeroUsize>,
}

impl HistoryConfig {
    /// Unbounded, strictly append-only history.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { max_messages: None }
    }

    /// Caps the number of retained messages; the oldest exchanges are
    /// evicted first, so an odd cap effectively retains one message less.
    #[must_use]
    pub const fn bounded(max_messages: NonZeroUsize) -> Self {
        Self {
            max_messages: Some(max_messages),
        }
    }

    /// Returns the configured cap, if any.
    #[must_use]
    pub const fn max_messages(self) -> Option<NonZeroUsize> {
        self.max_messages
    }
}

/// Append-only conversation log owned by exactly one agent.
///
/// Messages are never reordered. They leave the log only through
/// [`clear`](Self::clear) or, when a cap is configured, by evicting the oldest
/// entries; the most recent user/assistant pair is always retained.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    config: HistoryConfig,
    entries: VecDeque<PromptMessage>,
}

impl ConversationHistory {
    /// Creates an empty, unbounded history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty history using the supplied configuration.
    #[must_use]
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            entries: VecDeque::new(),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> HistoryConfig {
        self.config
    }

    /// Appends a single message.
    pub fn push(&mut self, message: PromptMessage) {
        self.entries.push_back(message);
        self.enforce_cap();
    }

    /// Appends the user input and the final answer of one top-level call.
    pub fn record_exchange(&mut self, input: impl Into<String>, answer: impl Into<String>) {
        self.entries
            .push_back(PromptMessage::new(MessageRole::User, input));
        self.entries
            .push_back(PromptMessage::new(MessageRole::Assistant, answer));
        self.enforce_cap();
    }

    /// Iterates over messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PromptMessage> {
        self.entries.iter()
    }

    /// Copies the transcript into a vector, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PromptMessage> {
        self.entries.iter().cloned().collect()
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&PromptMessage> {
        self.entries.back()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every message.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn enforce_cap(&mut self) {
        let Some(limit) = self.config.max_messages() else {
            return;
        };
        let floor = limit.get().max(2);

        let mut evicted = 0_usize;
        while self.entries.len() > floor {
            self.entries.pop_front();
            evicted += 1;
        }
        // An exchange is evicted whole: the head must stay a user message.
        if evicted > 0 {
            while self.entries.len() > 2
                && self
                    .entries
                    .front()
                    .is_some_and(|message| message.role() != MessageRole::User)
            {
                self.entries.pop_front();
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, retained = self.entries.len(), "history cap enforced");
        }
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a PromptMessage;
    type IntoIter = std::collections::vec_deque::Iter<'a, PromptMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_exchange_in_order() {
        let mut history = ConversationHistory::new();
        history.record_exchange("hi", "hello");

        assert_eq!(
            history.snapshot(),
            vec![PromptMessage::user("hi"), PromptMessage::assistant("hello")]
        );
    }

    #[test]
    fn unbounded_history_keeps_everything() {
        let mut history = ConversationHistory::new();
        for i in 0..50 {
            history.record_exchange(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(history.len(), 100);
        assert_eq!(history.iter().next().unwrap().content(), "q0");
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let mut history =
            ConversationHistory::with_config(HistoryConfig::bounded(NonZeroUsize::new(4).unwrap()));
        history.record_exchange("one", "1");
        history.record_exchange("two", "2");
        history.record_exchange("three", "3");

        let contents: Vec<_> = history.iter().map(PromptMessage::content).collect();
        assert_eq!(contents, ["two", "2", "three", "3"]);
    }

    #[test]
    fn odd_cap_evicts_whole_exchanges() {
        let mut history =
            ConversationHistory::with_config(HistoryConfig::bounded(NonZeroUsize::new(3).unwrap()));
        history.record_exchange("one", "1");
        history.record_exchange("two", "2");

        let head = history.iter().next().unwrap();
        assert_eq!(head.role(), MessageRole::User);
        let contents: Vec<_> = history.iter().map(PromptMessage::content).collect();
        assert_eq!(contents, ["two", "2"]);

        history.record_exchange("three", "3");
        let contents: Vec<_> = history.iter().map(PromptMessage::content).collect();
        assert_eq!(contents, ["three", "3"]);
    }

    #[test]
    fn cap_never_drops_the_latest_pair() {
        let mut history =
            ConversationHistory::with_config(HistoryConfig::bounded(NonZeroUsize::new(1).unwrap()));
        history.record_exchange("q", "a");

        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().content(), "a");
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut history = ConversationHistory::new();
        history.push(PromptMessage::user("hello"));
        history.clear();
        assert!(history.is_empty());
    }
}
