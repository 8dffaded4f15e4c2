use thiserror::Error;

use crate::state::room::Team;

/// Phases a room moves through while a game is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Participants are joining and the game is being configured.
    Setup,
    /// The active clue-giver (or every participant, in the scale game) writes clues.
    ClueGiving,
    /// Required contributors submit their guesses.
    Guessing,
    /// Guesses are being scored. Only ever observed inside the room lock.
    Scoring,
    /// The game is over; scores and history stay readable.
    Finished,
}

/// Indicates why a room reached [`RoundPhase::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Every pre-computed round has been played.
    RoundsCompleted,
    /// A team communicated enough codes to win.
    CodesCommunicated(Team),
    /// A team had its code intercepted too many times and lost.
    Intercepted(Team),
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// The room is configured and the first turn begins.
    Start,
    /// Every clue required for the open round is populated.
    CluesComplete,
    /// Every required contributor has submitted a guess.
    QuorumReached,
    /// Scoring is done and the next clue-giver takes over.
    NextTurn,
    /// Scoring is done and the game ends.
    Finish(FinishReason),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RoundPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Reason the game finished, once it has.
    pub finish_reason: Option<FinishReason>,
}

/// State machine implementing the clue → guess → score loop of a room.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    phase: RoundPhase,
    version: usize,
    finish_reason: Option<FinishReason>,
}

impl Default for RoomStateMachine {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Setup,
            version: 0,
            finish_reason: None,
        }
    }
}

impl RoomStateMachine {
    /// Create a new state machine initialised in the setup state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Reason recorded by the [`RoundEvent::Finish`] transition.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            finish_reason: self.finish_reason,
        }
    }

    /// Validate an event without applying it, returning the phase it would lead to.
    pub fn check(&self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        self.compute_transition(event)
    }

    /// Apply an event, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if let RoundEvent::Finish(reason) = event {
            self.finish_reason = Some(reason);
        }
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RoundPhase::Setup, RoundEvent::Start) => RoundPhase::ClueGiving,
            (RoundPhase::ClueGiving, RoundEvent::CluesComplete) => RoundPhase::Guessing,
            (RoundPhase::Guessing, RoundEvent::QuorumReached) => RoundPhase::Scoring,
            (RoundPhase::Scoring, RoundEvent::NextTurn) => RoundPhase::ClueGiving,
            (RoundPhase::Scoring, RoundEvent::Finish(..)) => RoundPhase::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoomStateMachine, event: RoundEvent) -> RoundPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_setup() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.phase(), RoundPhase::Setup);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = RoomStateMachine::new();

        assert_eq!(apply(&mut sm, RoundEvent::Start), RoundPhase::ClueGiving);
        assert_eq!(
            apply(&mut sm, RoundEvent::CluesComplete),
            RoundPhase::Guessing
        );
        assert_eq!(
            apply(&mut sm, RoundEvent::QuorumReached),
            RoundPhase::Scoring
        );
        assert_eq!(apply(&mut sm, RoundEvent::NextTurn), RoundPhase::ClueGiving);
        apply(&mut sm, RoundEvent::CluesComplete);
        apply(&mut sm, RoundEvent::QuorumReached);
        assert_eq!(
            apply(
                &mut sm,
                RoundEvent::Finish(FinishReason::Intercepted(Team::Red))
            ),
            RoundPhase::Finished
        );

        let snapshot = sm.snapshot();
        assert_eq!(snapshot.version, 7);
        assert_eq!(
            snapshot.finish_reason,
            Some(FinishReason::Intercepted(Team::Red))
        );
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoundEvent::Start);
        apply(&mut sm, RoundEvent::CluesComplete);
        apply(&mut sm, RoundEvent::QuorumReached);
        apply(&mut sm, RoundEvent::Finish(FinishReason::RoundsCompleted));

        for event in [
            RoundEvent::Start,
            RoundEvent::CluesComplete,
            RoundEvent::QuorumReached,
            RoundEvent::NextTurn,
        ] {
            let err = sm.apply(event).unwrap_err();
            assert_eq!(err.from, RoundPhase::Finished);
        }
    }

    #[test]
    fn invalid_transition_returns_error_and_keeps_version() {
        let mut sm = RoomStateMachine::new();
        let err = sm.apply(RoundEvent::QuorumReached).unwrap_err();
        assert_eq!(err.from, RoundPhase::Setup);
        assert_eq!(err.event, RoundEvent::QuorumReached);
        assert_eq!(sm.version(), 0);
        assert_eq!(sm.phase(), RoundPhase::Setup);
    }

    #[test]
    fn check_does_not_mutate() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.check(RoundEvent::Start), Ok(RoundPhase::ClueGiving));
        assert_eq!(sm.phase(), RoundPhase::Setup);
    }
}
