//! Model transports used by agents.
//!
//! [`traits`] defines the [`ModelAdapter`](traits::ModelAdapter) seam the
//! orchestration loop talks to; [`openai`] implements it for any
//! OpenAI-compatible chat-completions endpoint and [`scripted`] replays
//! canned responses for tests and demos.

#![warn(missing_docs, clippy::pedantic)]

pub mod openai;
pub mod scripted;
pub mod traits;

mod http_client;
mod sse;
