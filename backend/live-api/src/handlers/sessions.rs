use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::models::error::GameError;
use crate::models::seed::SessionSeed;
use crate::services::AppState;

pub(crate) fn error_status(error: &GameError) -> StatusCode {
    match error {
        GameError::SessionNotFound | GameError::ParticipantNotFound => StatusCode::NOT_FOUND,
        GameError::Unauthorized(_) => StatusCode::FORBIDDEN,
        GameError::InvalidPhase(_) | GameError::DuplicateAnswer => StatusCode::CONFLICT,
        GameError::Validation(_) => StatusCode::BAD_REQUEST,
        GameError::SessionEnded => StatusCode::GONE,
    }
}

/// Seeds a live session from a finalized question list. Posting the
/// same session id again returns the existing session unchanged.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(seed): Json<SessionSeed>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        session_id = %seed.session_id,
        host_id = %seed.host_id,
        questions = seed.questions.len(),
        "seeding session"
    );

    match state.registry.create(seed).await {
        Ok((session, created)) => {
            let snapshot = session.lock().await.snapshot();
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((status, Json(snapshot)))
        }
        Err(e) => {
            tracing::warn!("failed to seed session: {}", e);
            Err((error_status(&e), e.to_string()))
        }
    }
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.registry.get(&session_id).await {
        Ok(session) => {
            let snapshot = session.lock().await.snapshot();
            Ok((StatusCode::OK, Json(snapshot)))
        }
        Err(e) => Err((error_status(&e), e.to_string())),
    }
}
