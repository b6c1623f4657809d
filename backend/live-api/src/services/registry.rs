use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::info;

use crate::config::GameTimings;
use crate::metrics;
use crate::models::error::GameError;
use crate::models::seed::SessionSeed;
use crate::services::broadcast::BroadcastHub;
use crate::services::session::{GameSession, SharedSession};
use crate::services::store::AnswerStore;

/// Process-wide table of live sessions. Each entry is an
/// `Arc<Mutex<GameSession>>`, so operations on the same session
/// serialize on the session mutex while distinct sessions run in
/// parallel; the map lock is only held for lookups and inserts.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
    hub: Arc<BroadcastHub>,
    store: Arc<dyn AnswerStore>,
    timings: GameTimings,
    evict_tx: mpsc::UnboundedSender<String>,
}

impl SessionRegistry {
    /// Builds the registry and spawns the eviction listener. Finished
    /// sessions schedule themselves onto the eviction channel after
    /// their grace period.
    pub fn new(
        hub: Arc<BroadcastHub>,
        store: Arc<dyn AnswerStore>,
        timings: GameTimings,
    ) -> Arc<Self> {
        let (evict_tx, mut evict_rx) = mpsc::unbounded_channel::<String>();
        let registry = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            hub,
            store,
            timings,
            evict_tx,
        });

        let weak = Arc::downgrade(&registry);
        tokio::spawn(async move {
            while let Some(session_id) = evict_rx.recv().await {
                match weak.upgrade() {
                    Some(registry) => registry.remove(&session_id).await,
                    None => break,
                }
            }
        });

        registry
    }

    /// Seeds a session, or returns the existing one for the same id.
    pub async fn create(&self, seed: SessionSeed) -> Result<(SharedSession, bool), GameError> {
        GameSession::validate_seed(&seed)?;

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&seed.session_id) {
            return Ok((Arc::clone(existing), false));
        }

        let session_id = seed.session_id.clone();
        let events = self.hub.register(&session_id).await;
        let store = Arc::clone(&self.store);
        let timings = self.timings;
        let evict_tx = self.evict_tx.clone();
        let session = Arc::new_cyclic(|weak| {
            Mutex::new(GameSession::new(
                seed,
                events,
                store,
                timings,
                evict_tx,
                weak.clone(),
            ))
        });
        sessions.insert(session_id.clone(), Arc::clone(&session));

        metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
        metrics::SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        info!(session_id = %session_id, "session created");
        Ok((session, true))
    }

    pub async fn get(&self, session_id: &str) -> Result<SharedSession, GameError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(Arc::clone)
            .ok_or(GameError::SessionNotFound)
    }

    pub async fn remove(&self, session_id: &str) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(session_id);
            metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
            removed
        };

        if let Some(session) = removed {
            session.lock().await.shutdown();
            self.hub.remove(session_id).await;
            metrics::SESSIONS_TOTAL.with_label_values(&["evicted"]).inc();
            info!(session_id, "session evicted");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Question, QuestionKind, QuestionOption};
    use crate::services::store::InMemoryAnswerStore;
    use std::time::Duration;

    fn seed(session_id: &str) -> SessionSeed {
        SessionSeed {
            session_id: session_id.to_string(),
            host_id: "host".to_string(),
            questions: vec![Question {
                id: "q1".to_string(),
                text: "?".to_string(),
                kind: QuestionKind::TrueFalse,
                options: vec![
                    QuestionOption {
                        text: "true".to_string(),
                        correct: true,
                    },
                    QuestionOption {
                        text: "false".to_string(),
                        correct: false,
                    },
                ],
                canonical_answer: None,
                time_limit_secs: 10,
            }],
        }
    }

    fn build_registry() -> Arc<SessionRegistry> {
        let timings = GameTimings {
            lobby_countdown: Duration::from_secs(1),
            grading_display: Duration::from_secs(1),
            finished_grace: Duration::from_secs(5),
        };
        SessionRegistry::new(
            Arc::new(BroadcastHub::new()),
            Arc::new(InMemoryAnswerStore::new()),
            timings,
        )
    }

    #[tokio::test]
    async fn create_is_get_or_create() {
        let registry = build_registry();
        let (_, created) = registry.create(seed("s1")).await.unwrap();
        assert!(created);
        let (_, created) = registry.create(seed("s1")).await.unwrap();
        assert!(!created);
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn create_rejects_invalid_seeds() {
        let registry = build_registry();
        let mut bad = seed("s1");
        bad.questions.clear();
        assert!(matches!(
            registry.create(bad).await,
            Err(GameError::Validation(_))
        ));
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn get_unknown_session_fails() {
        let registry = build_registry();
        assert!(matches!(
            registry.get("ghost").await,
            Err(GameError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn remove_drops_session_and_channel() {
        let registry = build_registry();
        registry.create(seed("s1")).await.unwrap();
        registry.remove("s1").await;
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.get("s1").await.is_err());
    }
}
