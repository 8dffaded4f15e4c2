use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::GameError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Requested room does not exist (or was evicted).
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation cannot be performed in the room's current phase.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),
    /// The participant may not perform this operation.
    #[error("not allowed: {0}")]
    NotAllowed(String),
    /// Clues were rejected.
    #[error("invalid clue: {0}")]
    InvalidClue(String),
    /// A guess was rejected.
    #[error("invalid guess: {0}")]
    InvalidGuess(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<GameError> for ServiceError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::InvalidPhase(message) | GameError::NotReady(message) => {
                ServiceError::InvalidPhase(message)
            }
            GameError::NotAllowed(message) => ServiceError::NotAllowed(message),
            GameError::InvalidClue(message) => ServiceError::InvalidClue(message),
            GameError::InvalidGuess(message) => ServiceError::InvalidGuess(message),
            GameError::InvalidInput(message) => ServiceError::InvalidInput(message),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The caller may not perform this action.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidPhase(message) => AppError::Conflict(message),
            ServiceError::NotAllowed(message) => AppError::Forbidden(message),
            ServiceError::InvalidClue(message)
            | ServiceError::InvalidGuess(message)
            | ServiceError::InvalidInput(message) => AppError::BadRequest(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
