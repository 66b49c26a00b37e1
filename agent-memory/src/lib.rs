//! Memory interfaces for agents.
//!
//! The core keeps a single append-only transcript per agent; see
//! [`ConversationHistory`].

#![warn(missing_docs, clippy::pedantic)]

mod history;

pub use history::{ConversationHistory, HistoryConfig};
