//! State machine for one top-level call.

use thiserror::Error;
use tracing::debug;

/// Phases a call moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Building the outbound message list.
    Compose,
    /// Waiting for the model transport.
    ModelCall,
    /// Scanning the response for directives.
    Parse,
    /// Running the directives against the registry.
    Dispatch,
    /// The final answer is known.
    Done,
}

impl TurnPhase {
    /// Returns `true` once the final answer is known.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Events that move a call between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// The message list is ready.
    Composed,
    /// The model returned a full response.
    Responded,
    /// The response holds no directive.
    NoDirectives,
    /// The response holds at least one directive.
    DirectivesFound,
    /// Every directive was dispatched and the results appended.
    Dispatched,
}

/// Progress of one call through the loop.
///
/// A call performs at most `max_iterations + 1` model calls: once
/// `max_iterations` responses have been received, the next call is forced
/// and its response is final without being parsed.
#[derive(Debug, Clone, Copy)]
pub struct Turn {
    phase: TurnPhase,
    max_iterations: usize,
    model_calls: usize,
    tool_calls: usize,
}

impl Turn {
    /// Starts a call in [`TurnPhase::Compose`].
    #[must_use]
    pub const fn new(max_iterations: usize) -> Self {
        Self {
            phase: TurnPhase::Compose,
            max_iterations,
            model_calls: 0,
            tool_calls: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Model responses received so far.
    #[must_use]
    pub const fn model_calls(&self) -> usize {
        self.model_calls
    }

    /// Directives dispatched so far.
    #[must_use]
    pub const fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    /// One-based number of the next (or current) model call.
    #[must_use]
    pub const fn round(&self) -> usize {
        self.model_calls + 1
    }

    /// Whether the next model call is the unconditional final one.
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        self.model_calls >= self.max_iterations
    }

    /// Counts one dispatched directive.
    pub fn record_tool_call(&mut self) {
        self.tool_calls += 1;
    }

    /// Applies an event, returning the new phase.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::InvalidTransition`] when the event is not
    /// allowed in the current phase.
    pub fn transition(&mut self, event: TurnEvent) -> TurnResult<TurnPhase> {
        let next = match (self.phase, event) {
            (TurnPhase::Compose, TurnEvent::Composed) => Some(TurnPhase::ModelCall),
            (TurnPhase::ModelCall, TurnEvent::Responded) => {
                let forced = self.is_forced();
                self.model_calls += 1;
                Some(if forced { TurnPhase::Done } else { TurnPhase::Parse })
            }
            (TurnPhase::Parse, TurnEvent::NoDirectives) => Some(TurnPhase::Done),
            (TurnPhase::Parse, TurnEvent::DirectivesFound) => Some(TurnPhase::Dispatch),
            (TurnPhase::Dispatch, TurnEvent::Dispatched) => Some(TurnPhase::Compose),
            _ => None,
        };

        let Some(next_phase) = next else {
            return Err(TurnError::InvalidTransition {
                from: self.phase,
                event,
            });
        };

        debug!(
            from = ?self.phase,
            to = ?next_phase,
            ?event,
            round = self.model_calls,
            "turn transition"
        );
        self.phase = next_phase;
        Ok(next_phase)
    }
}

/// Errors emitted by [`Turn::transition`].
#[derive(Debug, Error)]
pub enum TurnError {
    /// The event is not allowed in the current phase.
    #[error("invalid turn transition from {from:?} via {event:?}")]
    InvalidTransition {
        /// Phase before the attempted transition.
        from: TurnPhase,
        /// Offending event.
        event: TurnEvent,
    },
}

/// Result alias used for turn transitions.
pub type TurnResult<T> = Result<T, TurnError>;
