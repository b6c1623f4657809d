use thiserror::Error;

/// Engine error taxonomy. Every variant maps to a caller-scoped error
/// frame on the socket or a status code on the REST surface; none of
/// them mutate session state or reach other subscribers.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("session not found")]
    SessionNotFound,

    #[error("participant not found")]
    ParticipantNotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("answer already submitted for this question")]
    DuplicateAnswer,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session has ended")]
    SessionEnded,
}
