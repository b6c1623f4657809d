use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// Handoff payload from the authoring side: a finalized, ordered
/// question list plus the identities a live session needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSeed {
    pub session_id: String,
    pub host_id: String,
    pub questions: Vec<Question>,
}
