use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info, warn};

use crate::config::GameTimings;
use crate::metrics;
use crate::models::answer::{AnswerRecord, ScoreboardRow};
use crate::models::error::GameError;
use crate::models::event::{ActiveQuestionView, PhaseView, SessionEvent, SessionSnapshot};
use crate::models::question::{Question, QuestionKind, QuestionPublic};
use crate::models::seed::SessionSeed;
use crate::services::auth::CallerIdentity;
use crate::services::roster::ParticipantRoster;
use crate::services::scheduler::QuestionScheduler;
use crate::services::scoring::AnswerScoringEngine;
use crate::services::store::AnswerStore;
use crate::utils::retry::{retry_with_backoff, RetryPolicy};

pub type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    QuestionActive(usize),
    Grading(usize),
    Finished,
}

/// One live quiz run. Every operation takes `&mut self` under the
/// session mutex, so per-session event order equals application order.
pub struct GameSession {
    id: String,
    host_id: String,
    questions: Arc<Vec<Question>>,
    phase: Phase,
    /// Set once `start` is accepted; the lobby countdown runs with the
    /// phase still `Lobby`, and a second `start` is rejected.
    started: bool,
    phase_started_at: tokio::time::Instant,
    phase_started_wall: DateTime<Utc>,
    roster: ParticipantRoster,
    /// Answers for the current question only; flushed to the store at
    /// grading and dropped.
    answers: HashMap<String, AnswerRecord>,
    scheduler: QuestionScheduler,
    events: broadcast::Sender<SessionEvent>,
    store: Arc<dyn AnswerStore>,
    timings: GameTimings,
    evict_tx: mpsc::UnboundedSender<String>,
    self_ref: Weak<Mutex<GameSession>>,
}

impl GameSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: SessionSeed,
        events: broadcast::Sender<SessionEvent>,
        store: Arc<dyn AnswerStore>,
        timings: GameTimings,
        evict_tx: mpsc::UnboundedSender<String>,
        self_ref: Weak<Mutex<GameSession>>,
    ) -> Self {
        Self {
            id: seed.session_id,
            host_id: seed.host_id,
            questions: Arc::new(seed.questions),
            phase: Phase::Lobby,
            started: false,
            phase_started_at: tokio::time::Instant::now(),
            phase_started_wall: Utc::now(),
            roster: ParticipantRoster::new(),
            answers: HashMap::new(),
            scheduler: QuestionScheduler::new(),
            events,
            store,
            timings,
            evict_tx,
            self_ref,
        }
    }

    pub fn validate_seed(seed: &SessionSeed) -> Result<(), GameError> {
        if seed.session_id.trim().is_empty() {
            return Err(GameError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }
        if seed.host_id.trim().is_empty() {
            return Err(GameError::Validation(
                "host_id must not be empty".to_string(),
            ));
        }
        if seed.questions.is_empty() {
            return Err(GameError::Validation(
                "question list must not be empty".to_string(),
            ));
        }
        for question in &seed.questions {
            if question.time_limit_secs == 0 {
                return Err(GameError::Validation(format!(
                    "question {} must have a positive time limit",
                    question.id
                )));
            }
            match question.kind {
                QuestionKind::SingleChoice | QuestionKind::TrueFalse => {
                    if !question.options.iter().any(|o| o.correct) {
                        return Err(GameError::Validation(format!(
                            "question {} needs an option marked correct",
                            question.id
                        )));
                    }
                }
                QuestionKind::ShortAnswer | QuestionKind::FillBlank => {
                    let has_answer = question
                        .canonical_answer
                        .as_deref()
                        .map(|a| !a.trim().is_empty())
                        .unwrap_or(false);
                    if !has_answer {
                        return Err(GameError::Validation(format!(
                            "question {} needs a canonical answer",
                            question.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Registers the caller in the roster (hosts are not participants)
    /// and returns the current snapshot. Re-joining is idempotent, so
    /// reconnects resume without losing approval or score.
    pub fn join(&mut self, identity: &CallerIdentity, display_name: &str) -> SessionSnapshot {
        if !identity.is_host && self.phase != Phase::Finished {
            let (entry, created) = self.roster.add_waiting(&identity.user_id, display_name);
            if created {
                info!(session_id = %self.id, participant_id = %entry.participant_id, "participant joined");
                self.publish(SessionEvent::ParticipantJoined { participant: entry });
            }
        }
        self.snapshot()
    }

    pub fn start(&mut self, identity: &CallerIdentity) -> Result<(), GameError> {
        self.require_host(identity)?;
        match self.phase {
            Phase::Finished => return Err(GameError::SessionEnded),
            Phase::Lobby if !self.started => {}
            _ => {
                return Err(GameError::InvalidPhase(
                    "game already started".to_string(),
                ))
            }
        }
        if self.roster.approved_count() == 0 {
            return Err(GameError::Validation(
                "at least one approved participant is required".to_string(),
            ));
        }

        self.started = true;
        let countdown = self.timings.lobby_countdown;
        self.publish(SessionEvent::GameStarted {
            countdown_secs: countdown.as_secs(),
        });
        self.arm_timer(countdown);
        info!(session_id = %self.id, countdown_secs = countdown.as_secs(), "game starting");
        Ok(())
    }

    pub fn approve_participant(
        &mut self,
        identity: &CallerIdentity,
        participant_id: &str,
    ) -> Result<(), GameError> {
        self.require_host(identity)?;
        if self.phase == Phase::Finished {
            return Err(GameError::SessionEnded);
        }
        let entry = self.roster.approve(participant_id)?;
        let event = SessionEvent::ParticipantStatusChanged {
            participant_id: entry.participant_id.clone(),
            status: entry.status,
        };
        info!(session_id = %self.id, participant_id, "participant approved");
        self.publish(event);
        Ok(())
    }

    pub async fn remove_participant(
        &mut self,
        identity: &CallerIdentity,
        participant_id: &str,
    ) -> Result<(), GameError> {
        self.require_host(identity)?;
        if self.phase == Phase::Finished {
            return Err(GameError::SessionEnded);
        }
        let removed = self.roster.remove(participant_id)?;
        info!(session_id = %self.id, participant_id, "participant removed");
        self.publish(SessionEvent::ParticipantRemoved {
            participant_id: removed.participant_id,
        });

        // The removed participant may have been the last one holding
        // the question open.
        if let Phase::QuestionActive(index) = self.phase {
            if self.all_approved_answered() {
                self.finish_question(index).await;
            }
        }
        Ok(())
    }

    pub async fn submit_answer(
        &mut self,
        identity: &CallerIdentity,
        value: String,
    ) -> Result<(), GameError> {
        let index = match self.phase {
            Phase::Finished => return Err(GameError::SessionEnded),
            Phase::QuestionActive(index) => index,
            _ => {
                return Err(GameError::InvalidPhase(
                    "no question is active".to_string(),
                ))
            }
        };

        let elapsed = self.phase_started_at.elapsed();
        if elapsed > self.question_limit(index) {
            return Err(GameError::InvalidPhase("answer window closed".to_string()));
        }

        let entry = self
            .roster
            .get(&identity.user_id)
            .ok_or(GameError::ParticipantNotFound)?;
        if !entry.is_approved() {
            return Err(GameError::Unauthorized(
                "not approved for this session".to_string(),
            ));
        }
        if self.answers.contains_key(&identity.user_id) {
            return Err(GameError::DuplicateAnswer);
        }

        let elapsed_ms = elapsed.as_millis() as u64;
        let question = &self.questions[index];
        let (correct, awarded) = AnswerScoringEngine::score(question, &value, elapsed_ms);
        let record = AnswerRecord {
            participant_id: identity.user_id.clone(),
            question_id: question.id.clone(),
            value,
            correct,
            elapsed_ms,
            awarded,
            submitted_at: Utc::now(),
        };
        self.answers.insert(identity.user_id.clone(), record);

        if let Some(entry) = self.roster.get_mut(&identity.user_id) {
            entry.score += awarded;
            if correct {
                entry.correct_count += 1;
            }
        }

        metrics::ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[if correct { "true" } else { "false" }])
            .inc();
        info!(
            session_id = %self.id,
            participant_id = %identity.user_id,
            correct,
            awarded,
            elapsed_ms,
            "answer submitted"
        );

        if self.all_approved_answered() {
            self.finish_question(index).await;
        }
        Ok(())
    }

    /// Client-facing state. Never exposes correctness for the active
    /// question; `remaining_ms` shrinks with elapsed time so reconnects
    /// cannot restart the clock.
    pub fn snapshot(&self) -> SessionSnapshot {
        let current_question = if let Phase::QuestionActive(index) = self.phase {
            let question = &self.questions[index];
            let limit_ms = question.time_limit_secs * 1000;
            let elapsed_ms = self.phase_started_at.elapsed().as_millis() as u64;
            Some(ActiveQuestionView {
                question: QuestionPublic::from(question),
                number: index + 1,
                total: self.questions.len(),
                remaining_ms: limit_ms.saturating_sub(elapsed_ms),
            })
        } else {
            None
        };

        SessionSnapshot {
            session_id: self.id.clone(),
            phase: self.phase_view(),
            phase_started_at: self.phase_started_wall,
            roster: self.roster.snapshot(),
            current_question,
            questions_total: self.questions.len(),
        }
    }

    pub fn phase_view(&self) -> PhaseView {
        match self.phase {
            Phase::Lobby => PhaseView::Lobby,
            Phase::QuestionActive(_) => PhaseView::QuestionActive,
            Phase::Grading(_) => PhaseView::Grading,
            Phase::Finished => PhaseView::Finished,
        }
    }

    /// Approved participants ranked by score, then correct count, then
    /// join order (the sort is stable).
    pub fn standings(&self) -> Vec<ScoreboardRow> {
        let mut rows: Vec<ScoreboardRow> = self
            .roster
            .approved()
            .map(|e| ScoreboardRow {
                participant_id: e.participant_id.clone(),
                display_name: e.display_name.clone(),
                score: e.score,
                correct_count: e.correct_count,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.correct_count.cmp(&a.correct_count))
        });
        rows
    }

    /// Ends the current question. Both the deadline timer and the
    /// everyone-answered path land here; the phase guard makes the
    /// second arrival a no-op.
    pub(crate) async fn finish_question(&mut self, index: usize) {
        if self.phase != Phase::QuestionActive(index) {
            return;
        }
        self.transition(Phase::Grading(index));

        let records: Vec<AnswerRecord> = self.answers.drain().map(|(_, r)| r).collect();
        if !records.is_empty() {
            let result = retry_with_backoff(RetryPolicy::store_flush(), || {
                let store = Arc::clone(&self.store);
                let session_id = self.id.clone();
                let records = records.clone();
                async move { store.append(&session_id, &records).await }
            })
            .await;
            if let Err(e) = result {
                error!(
                    session_id = %self.id,
                    question_index = index,
                    error = %e,
                    "answer flush failed, continuing with a persistence gap"
                );
            }
        }

        let question = &self.questions[index];
        let event = SessionEvent::QuestionEnd {
            question_id: question.id.clone(),
            correct_answer: question.correct_answer(),
            scoreboard: self.standings(),
        };
        self.publish(event);
        self.arm_timer(self.timings.grading_display);
        info!(session_id = %self.id, question = index + 1, "question ended");
    }

    pub(crate) async fn advance_after(&mut self, index: usize) {
        if self.phase != Phase::Grading(index) {
            return;
        }
        if index + 1 < self.questions.len() {
            self.begin_question(index + 1);
        } else {
            self.finish_game();
        }
    }

    pub(crate) async fn on_timer_fired(&mut self, epoch: u64) {
        if !self.scheduler.is_current(epoch) {
            metrics::record_timer_fire_stale();
            return;
        }
        metrics::record_timer_fire_acted();

        match self.phase {
            Phase::Lobby if self.started => self.begin_question(0),
            Phase::QuestionActive(index) => self.finish_question(index).await,
            Phase::Grading(index) => self.advance_after(index).await,
            Phase::Finished => {
                if self.evict_tx.send(self.id.clone()).is_err() {
                    warn!(session_id = %self.id, "eviction channel closed");
                }
            }
            Phase::Lobby => {}
        }
    }

    /// Invalidates any pending timer; called when the registry drops
    /// the session.
    pub(crate) fn shutdown(&mut self) {
        self.scheduler.cancel();
    }

    fn begin_question(&mut self, index: usize) {
        self.transition(Phase::QuestionActive(index));
        self.answers.clear();

        let question = &self.questions[index];
        let time_limit_secs = question.time_limit_secs;
        let limit = Duration::from_secs(time_limit_secs);
        let event = SessionEvent::NextQuestion {
            question: QuestionPublic::from(question),
            number: index + 1,
            total: self.questions.len(),
        };
        self.publish(event);
        self.arm_timer(limit);
        info!(session_id = %self.id, question = index + 1, limit_secs = time_limit_secs, "question started");
    }

    fn finish_game(&mut self) {
        self.transition(Phase::Finished);
        let standings = self.standings();
        self.publish(SessionEvent::GameEnd { standings });
        metrics::SESSIONS_TOTAL.with_label_values(&["finished"]).inc();
        self.arm_timer(self.timings.finished_grace);
        info!(session_id = %self.id, "game finished");
    }

    fn transition(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_started_at = tokio::time::Instant::now();
        self.phase_started_wall = Utc::now();
    }

    fn arm_timer(&mut self, delay: Duration) {
        self.scheduler.arm(self.self_ref.clone(), delay);
    }

    fn require_host(&self, identity: &CallerIdentity) -> Result<(), GameError> {
        if identity.is_host && identity.user_id == self.host_id {
            Ok(())
        } else {
            Err(GameError::Unauthorized("host role required".to_string()))
        }
    }

    fn question_limit(&self, index: usize) -> Duration {
        Duration::from_secs(self.questions[index].time_limit_secs)
    }

    fn all_approved_answered(&self) -> bool {
        self.roster.approved_count() > 0
            && self
                .roster
                .approved()
                .all(|e| self.answers.contains_key(&e.participant_id))
    }

    fn publish(&self, event: SessionEvent) {
        metrics::EVENTS_BROADCAST_TOTAL
            .with_label_values(&[event.event_name()])
            .inc();
        // No receivers is fine, nobody may be connected yet.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Question, QuestionOption};
    use crate::services::store::InMemoryAnswerStore;

    fn seed(questions: Vec<Question>) -> SessionSeed {
        SessionSeed {
            session_id: "s1".to_string(),
            host_id: "host".to_string(),
            questions,
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: "?".to_string(),
            kind: QuestionKind::SingleChoice,
            options: vec![
                QuestionOption {
                    text: "yes".to_string(),
                    correct: true,
                },
                QuestionOption {
                    text: "no".to_string(),
                    correct: false,
                },
            ],
            canonical_answer: None,
            time_limit_secs: 30,
        }
    }

    fn timings() -> GameTimings {
        GameTimings {
            lobby_countdown: Duration::from_secs(3),
            grading_display: Duration::from_secs(2),
            finished_grace: Duration::from_secs(10),
        }
    }

    fn build_session(questions: Vec<Question>) -> SharedSession {
        let (events, _) = broadcast::channel(64);
        let (evict_tx, _evict_rx) = mpsc::unbounded_channel();
        let store: Arc<dyn AnswerStore> = Arc::new(InMemoryAnswerStore::new());
        Arc::new_cyclic(|weak| {
            Mutex::new(GameSession::new(
                seed(questions),
                events,
                store,
                timings(),
                evict_tx,
                weak.clone(),
            ))
        })
    }

    fn host() -> CallerIdentity {
        CallerIdentity {
            user_id: "host".to_string(),
            is_host: true,
        }
    }

    fn player(id: &str) -> CallerIdentity {
        CallerIdentity {
            user_id: id.to_string(),
            is_host: false,
        }
    }

    #[tokio::test]
    async fn validate_seed_rejects_bad_input() {
        assert!(matches!(
            GameSession::validate_seed(&seed(vec![])),
            Err(GameError::Validation(_))
        ));

        let mut no_correct = question("q1");
        no_correct.options.iter_mut().for_each(|o| o.correct = false);
        assert!(matches!(
            GameSession::validate_seed(&seed(vec![no_correct])),
            Err(GameError::Validation(_))
        ));

        let mut zero_limit = question("q1");
        zero_limit.time_limit_secs = 0;
        assert!(matches!(
            GameSession::validate_seed(&seed(vec![zero_limit])),
            Err(GameError::Validation(_))
        ));

        assert!(GameSession::validate_seed(&seed(vec![question("q1")])).is_ok());
    }

    #[tokio::test]
    async fn start_requires_host_and_an_approved_participant() {
        let session = build_session(vec![question("q1")]);
        let mut guard = session.lock().await;

        guard.join(&player("p1"), "Alice");

        assert!(matches!(
            guard.start(&player("p1")),
            Err(GameError::Unauthorized(_))
        ));
        assert!(matches!(
            guard.start(&host()),
            Err(GameError::Validation(_))
        ));

        guard.approve_participant(&host(), "p1").unwrap();
        assert!(guard.start(&host()).is_ok());
        assert!(matches!(
            guard.start(&host()),
            Err(GameError::InvalidPhase(_))
        ));
    }

    #[tokio::test]
    async fn submit_answer_enforces_roster_rules() {
        let session = build_session(vec![question("q1")]);
        let mut guard = session.lock().await;

        guard.join(&player("p1"), "Alice");
        guard.join(&player("p2"), "Bob");
        guard.approve_participant(&host(), "p1").unwrap();
        guard.approve_participant(&host(), "p2").unwrap();

        // No question active yet.
        assert!(matches!(
            guard.submit_answer(&player("p1"), "yes".to_string()).await,
            Err(GameError::InvalidPhase(_))
        ));

        guard.start(&host()).unwrap();
        guard.begin_question(0);

        assert!(matches!(
            guard
                .submit_answer(&player("ghost"), "yes".to_string())
                .await,
            Err(GameError::ParticipantNotFound)
        ));

        guard.join(&player("p3"), "Carol");
        assert!(matches!(
            guard.submit_answer(&player("p3"), "yes".to_string()).await,
            Err(GameError::Unauthorized(_))
        ));

        guard
            .submit_answer(&player("p1"), "yes".to_string())
            .await
            .unwrap();
        assert!(matches!(
            guard.submit_answer(&player("p1"), "no".to_string()).await,
            Err(GameError::DuplicateAnswer)
        ));
    }

    #[tokio::test]
    async fn all_answers_end_the_question_early() {
        let session = build_session(vec![question("q1"), question("q2")]);
        let mut guard = session.lock().await;

        guard.join(&player("p1"), "Alice");
        guard.approve_participant(&host(), "p1").unwrap();
        guard.start(&host()).unwrap();
        guard.begin_question(0);

        guard
            .submit_answer(&player("p1"), "yes".to_string())
            .await
            .unwrap();

        assert_eq!(guard.phase(), Phase::Grading(0));
        // A second finish for the same question is a no-op.
        guard.finish_question(0).await;
        assert_eq!(guard.phase(), Phase::Grading(0));
    }

    #[tokio::test]
    async fn standings_break_ties_deterministically() {
        let session = build_session(vec![question("q1")]);
        let mut guard = session.lock().await;

        for (id, name) in [("p1", "Alice"), ("p2", "Bob"), ("p3", "Carol")] {
            guard.join(&player(id), name);
            guard.approve_participant(&host(), id).unwrap();
        }
        guard.roster.get_mut("p2").unwrap().score = 900;
        guard.roster.get_mut("p3").unwrap().score = 900;
        guard.roster.get_mut("p3").unwrap().correct_count = 1;

        let rows = guard.standings();
        let ids: Vec<_> = rows.iter().map(|r| r.participant_id.as_str()).collect();
        // p3 beats p2 on correct count; p1 trails on score.
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
    }

    #[tokio::test]
    async fn snapshot_never_leaks_the_answer_key() {
        let session = build_session(vec![question("q1")]);
        let mut guard = session.lock().await;

        guard.join(&player("p1"), "Alice");
        guard.approve_participant(&host(), "p1").unwrap();
        guard.start(&host()).unwrap();
        guard.begin_question(0);

        let snapshot = guard.snapshot();
        assert_eq!(snapshot.phase, PhaseView::QuestionActive);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("correct_answer"));
        assert!(!json.contains("canonical_answer"));

        let view = snapshot.current_question.unwrap();
        assert_eq!(view.number, 1);
        assert!(view.remaining_ms <= 30_000);
    }

    #[tokio::test]
    async fn finished_session_rejects_mutations() {
        let session = build_session(vec![question("q1")]);
        let mut guard = session.lock().await;

        guard.join(&player("p1"), "Alice");
        guard.approve_participant(&host(), "p1").unwrap();
        guard.start(&host()).unwrap();
        guard.begin_question(0);
        guard.finish_question(0).await;
        guard.advance_after(0).await;

        assert_eq!(guard.phase(), Phase::Finished);
        assert!(matches!(
            guard.submit_answer(&player("p1"), "yes".to_string()).await,
            Err(GameError::SessionEnded)
        ));
        assert!(matches!(
            guard.start(&host()),
            Err(GameError::SessionEnded)
        ));
        assert!(matches!(
            guard.approve_participant(&host(), "p1"),
            Err(GameError::SessionEnded)
        ));
    }
}
