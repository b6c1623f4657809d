use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::handlers::sessions::error_status;
use crate::metrics;
use crate::models::event::{ClientMessage, SessionEvent};
use crate::services::auth::CallerIdentity;
use crate::services::session::SharedSession;
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// WebSocket entry point for a live session. The caller is resolved
/// and the session looked up before the upgrade, so bad credentials
/// and unknown sessions fail with a plain HTTP status.
pub async fn play_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<PlayQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let identity = state
        .authorizer
        .authorize(&session_id, &query.token)
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?;

    let session = state
        .registry
        .get(&session_id)
        .await
        .map_err(|e| (error_status(&e), e.to_string()))?;

    let display_name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| identity.user_id.clone());

    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, state, session, session_id, identity, display_name)
    }))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session: SharedSession,
    session_id: String,
    identity: CallerIdentity,
    display_name: String,
) {
    metrics::WS_CONNECTIONS_ACTIVE.inc();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the join snapshot so nothing published
    // in between is missed.
    let mut events = match state.hub.subscribe(&session_id).await {
        Ok(events) => events,
        Err(e) => {
            let frame = SessionEvent::Error {
                message: e.to_string(),
            }
            .to_frame();
            let _ = sender.send(Message::Text(frame.into())).await;
            metrics::WS_CONNECTIONS_ACTIVE.dec();
            return;
        }
    };

    let snapshot = session.lock().await.join(&identity, &display_name);
    let frame = SessionEvent::Snapshot { snapshot }.to_frame();
    if sender.send(Message::Text(frame.into())).await.is_err() {
        metrics::WS_CONNECTIONS_ACTIVE.dec();
        return;
    }

    info!(session_id = %session_id, user_id = %identity.user_id, "socket joined");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if sender.send(Message::Text(event.to_frame().into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Too slow to keep up; resync from a fresh snapshot.
                    warn!(session_id = %session_id, user_id = %identity.user_id, skipped, "subscriber lagged");
                    let snapshot = session.lock().await.snapshot();
                    let frame = SessionEvent::Snapshot { snapshot }.to_frame();
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(error) =
                        handle_client_message(&session, &identity, text.as_str()).await
                    {
                        if sender.send(Message::Text(error.to_frame().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    metrics::WS_CONNECTIONS_ACTIVE.dec();
    info!(session_id = %session_id, user_id = %identity.user_id, "socket disconnected");
}

/// Applies one client message to the session. Errors go back to the
/// sender only; successful operations broadcast through the session
/// itself.
async fn handle_client_message(
    session: &SharedSession,
    identity: &CallerIdentity,
    text: &str,
) -> Option<SessionEvent> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(SessionEvent::Error {
                message: format!("malformed message: {}", e),
            })
        }
    };

    let result = {
        let mut guard = session.lock().await;
        match message {
            ClientMessage::Start => guard.start(identity),
            ClientMessage::ApproveParticipant { participant_id } => {
                guard.approve_participant(identity, &participant_id)
            }
            ClientMessage::RemoveParticipant { participant_id } => {
                guard.remove_participant(identity, &participant_id).await
            }
            ClientMessage::SubmitAnswer { value } => guard.submit_answer(identity, value).await,
        }
    };

    result.err().map(|e| SessionEvent::Error {
        message: e.to_string(),
    })
}
