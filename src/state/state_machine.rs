use thiserror::Error;

use crate::dao::models::PhaseEntity;

/// High-level phases a match session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Roster editing: players can be added, removed, and renamed.
    Setup,
    /// A game is in progress: scores, rounds, and the timer move.
    Playing,
    /// A game has ended and its result is on display.
    Finished,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin a fresh game from the setup screen.
    StartGame,
    /// End the running game and compute its result.
    EndGame,
    /// Leave the final scoreboard to edit the roster, keeping scores.
    EditRoster,
    /// Confirmed full reset, legal from any phase.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
///
/// Callers treat this as a no-op condition: the state machine is left
/// untouched and the rejected event is logged, never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine gating which session mutations are legal.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Setup,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the setup phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Seed the phase from a persisted snapshot.
    pub fn restore(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    /// Apply an event, moving to the next phase when the transition is valid.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Setup, SessionEvent::StartGame) => SessionPhase::Playing,
            (SessionPhase::Playing, SessionEvent::EndGame) => SessionPhase::Finished,
            (SessionPhase::Finished, SessionEvent::EditRoster) => SessionPhase::Setup,
            (_, SessionEvent::Reset) => SessionPhase::Setup,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        self.phase = next;
        Ok(next)
    }
}

impl From<PhaseEntity> for SessionPhase {
    fn from(value: PhaseEntity) -> Self {
        match value {
            PhaseEntity::Setup => SessionPhase::Setup,
            PhaseEntity::Playing => SessionPhase::Playing,
            PhaseEntity::Finished => SessionPhase::Finished,
        }
    }
}

impl From<SessionPhase> for PhaseEntity {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Setup => PhaseEntity::Setup,
            SessionPhase::Playing => PhaseEntity::Playing,
            SessionPhase::Finished => PhaseEntity::Finished,
        }
    }
}
