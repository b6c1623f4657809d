use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::models::answer::AnswerRecord;

/// Durable sink for graded answers. The engine appends each question's
/// records at grading time and drops them from memory afterwards; what
/// backs the sink (database, queue, file) is the integrator's choice.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn append(&self, session_id: &str, records: &[AnswerRecord]) -> Result<()>;
}

/// Process-local store used by the binary and by tests.
#[derive(Default)]
pub struct InMemoryAnswerStore {
    records: Mutex<HashMap<String, Vec<AnswerRecord>>>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self, session_id: &str) -> Vec<AnswerRecord> {
        self.records
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnswerStore for InMemoryAnswerStore {
    async fn append(&self, session_id: &str, records: &[AnswerRecord]) -> Result<()> {
        let mut guard = self.records.lock().await;
        guard
            .entry(session_id.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }
}
