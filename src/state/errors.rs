use thiserror::Error;

use crate::state::state_machine::InvalidTransition;

/// Errors raised by the room rules when an action is rejected.
///
/// A rejected action never mutates the room.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    /// The action does not match the room's current phase.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),
    /// The participant is not allowed to perform this action.
    #[error("not allowed: {0}")]
    NotAllowed(String),
    /// A clue is malformed or the clue count is wrong.
    #[error("invalid clue: {0}")]
    InvalidClue(String),
    /// A guess lies outside its domain.
    #[error("invalid guess: {0}")]
    InvalidGuess(String),
    /// The room is missing something it needs before the game can start.
    #[error("room not ready: {0}")]
    NotReady(String),
    /// The request carries data the room cannot accept (names, teams, words).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<InvalidTransition> for GameError {
    fn from(err: InvalidTransition) -> Self {
        GameError::InvalidPhase(err.to_string())
    }
}
