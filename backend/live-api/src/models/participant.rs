use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Waiting,
    Approved,
    Rejected,
}

/// One roster entry. Entries keep their join order for the lifetime of
/// the session; scores only ever increase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub participant_id: String,
    pub display_name: String,
    pub status: ApprovalStatus,
    pub score: u32,
    pub correct_count: u32,
}

impl ParticipantEntry {
    pub fn new(participant_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            display_name: display_name.into(),
            status: ApprovalStatus::Waiting,
            score: 0,
            correct_count: 0,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}
