use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::{
    ApplyError, AttachError, PlanError,
    state_machine::{GameEvent, GamePhase},
};

/// Errors that can occur in service layer operations.
///
/// Every variant is scoped to a single connection or room; none of them is fatal.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Host action attempted by a connection that is not the room's host.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Malformed or out-of-range input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current room state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested room, game or player was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Second submission for a question that already has an answer from this player.
    #[error("duplicate submission: {0}")]
    Duplicate(String),
}

impl ServiceError {
    /// Whether the error should be reported back to the originating connection.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ServiceError::Duplicate(_))
    }

    /// Message without the category prefix, as shown to clients.
    pub fn detail(&self) -> &str {
        match self {
            ServiceError::Unauthorized(message)
            | ServiceError::InvalidInput(message)
            | ServiceError::InvalidState(message)
            | ServiceError::NotFound(message)
            | ServiceError::Duplicate(message) => message,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
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
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Duplicate(message) => AppError::Conflict(message),
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
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        let invalid = match err {
            PlanError::AlreadyPending => {
                return ServiceError::InvalidState("room is busy with another transition".into());
            }
            PlanError::InvalidTransition(invalid) => invalid,
        };

        let message = match (invalid.from, &invalid.event) {
            (GamePhase::Finished, _) => "Game has already finished".to_string(),
            (GamePhase::Active, GameEvent::NextQuestion) => {
                "A question is already running".to_string()
            }
            (_, GameEvent::SetAnswer(_) | GameEvent::TimerExpired) => {
                "No question is currently running".to_string()
            }
            _ => invalid.to_string(),
        };
        ServiceError::InvalidState(message)
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        let message = match err {
            ApplyError::NoPending => "room transition vanished before commit".to_string(),
            ApplyError::IdMismatch { expected, got } => {
                format!("room transition {got} does not match pending plan {expected}")
            }
            ApplyError::PhaseMismatch { expected, actual } => {
                format!("room moved from {expected:?} to {actual:?} during transition")
            }
            ApplyError::VersionMismatch { expected, actual } => {
                format!("room version {actual} does not match planned version {expected}")
            }
        };
        ServiceError::InvalidState(message)
    }
}

impl From<AttachError> for ServiceError {
    fn from(err: AttachError) -> Self {
        match err {
            AttachError::UnknownConnection(_) => ServiceError::NotFound(err.to_string()),
            AttachError::AlreadyAttached(_) => ServiceError::InvalidState(err.to_string()),
        }
    }
}
