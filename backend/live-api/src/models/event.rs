use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::answer::ScoreboardRow;
use crate::models::participant::{ApprovalStatus, ParticipantEntry};
use crate::models::question::QuestionPublic;

/// Which phase the session is in, as shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseView {
    Lobby,
    QuestionActive,
    Grading,
    Finished,
}

/// The currently running question as seen by a (re)connecting client.
/// `remaining_ms` is computed at snapshot time, so reconnects resume
/// with the time already spent subtracted rather than a fresh timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveQuestionView {
    pub question: QuestionPublic,
    pub number: usize,
    pub total: usize,
    pub remaining_ms: u64,
}

/// Full client-facing state of a session, sent on subscribe and on
/// demand over REST. Never contains correct answers for an active
/// question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: PhaseView,
    pub phase_started_at: DateTime<Utc>,
    pub roster: Vec<ParticipantEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<ActiveQuestionView>,
    pub questions_total: usize,
}

/// Events flowing to clients. Broadcast variants reach every subscriber
/// of a session; `Snapshot` and `Error` are only ever sent directly to
/// a single socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    ParticipantJoined {
        participant: ParticipantEntry,
    },
    ParticipantStatusChanged {
        participant_id: String,
        status: ApprovalStatus,
    },
    ParticipantRemoved {
        participant_id: String,
    },
    GameStarted {
        countdown_secs: u64,
    },
    NextQuestion {
        question: QuestionPublic,
        number: usize,
        total: usize,
    },
    QuestionEnd {
        question_id: String,
        correct_answer: String,
        scoreboard: Vec<ScoreboardRow>,
    },
    GameEnd {
        standings: Vec<ScoreboardRow>,
    },
    Snapshot {
        snapshot: SessionSnapshot,
    },
    Error {
        message: String,
    },
}

impl SessionEvent {
    /// Wire name of the event, used for metrics labels.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::ParticipantJoined { .. } => "participant-joined",
            SessionEvent::ParticipantStatusChanged { .. } => "participant-status-changed",
            SessionEvent::ParticipantRemoved { .. } => "participant-removed",
            SessionEvent::GameStarted { .. } => "game-started",
            SessionEvent::NextQuestion { .. } => "next-question",
            SessionEvent::QuestionEnd { .. } => "question-end",
            SessionEvent::GameEnd { .. } => "game-end",
            SessionEvent::Snapshot { .. } => "snapshot",
            SessionEvent::Error { .. } => "error",
        }
    }

    /// Serialize for the WebSocket wire. Falls back to a bare error
    /// frame if serialization ever fails.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }
}

/// Messages clients send over the WebSocket after joining.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Start,
    ApproveParticipant { participant_id: String },
    RemoveParticipant { participant_id: String },
    SubmitAnswer { value: String },
}
