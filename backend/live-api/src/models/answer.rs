use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One graded answer. At most one exists per (participant, question);
/// the session enforces that before a record is ever created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub participant_id: String,
    pub question_id: String,
    pub value: String,
    pub correct: bool,
    pub elapsed_ms: u64,
    pub awarded: u32,
    pub submitted_at: DateTime<Utc>,
}

/// One row of the per-question scoreboard or the final standings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardRow {
    pub participant_id: String,
    pub display_name: String,
    pub score: u32,
    pub correct_count: u32,
}
