use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle phases of a debate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Accepting stances, debaters and votes.
    Open,
    /// Conclusion side effects are in flight; commands targeting the match are refused.
    Concluding,
    /// Terminal; ratings were applied or the match was discarded.
    Concluded,
}

/// Events that can be applied to a match state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// A conclude vote passed or the topic changed under the match.
    BeginConclusion,
    /// Ratings and announcements were handled.
    FinishConclusion,
    /// Drop the match without rating it.
    Discard,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: MatchPhase,
    /// The event that cannot be applied from this phase.
    pub event: MatchEvent,
}

/// State machine guarding the lifecycle of a single match.
#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    phase: MatchPhase,
}

impl Default for MatchStateMachine {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Open,
        }
    }
}

impl MatchStateMachine {
    /// Create a new state machine in the open phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (MatchPhase::Open, MatchEvent::BeginConclusion) => MatchPhase::Concluding,
            (MatchPhase::Concluding, MatchEvent::FinishConclusion) => MatchPhase::Concluded,
            (MatchPhase::Open | MatchPhase::Concluding, MatchEvent::Discard) => {
                MatchPhase::Concluded
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
