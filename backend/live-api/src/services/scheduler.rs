use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::services::session::GameSession;

/// One pending wall-clock timer per session.
///
/// Arming bumps a monotonically increasing epoch and aborts the
/// previously spawned task, so at most one timer is live. The fired
/// callback re-locks the session and checks the epoch again before
/// acting; a fire that lost the race to an early question end or a
/// re-arm is a counted no-op.
pub struct QuestionScheduler {
    epoch: u64,
    pending: Option<JoinHandle<()>>,
}

impl Default for QuestionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionScheduler {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            pending: None,
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Arms the timer for `delay`. The session is held weakly so a
    /// pending timer never keeps an evicted session alive.
    pub fn arm(&mut self, session: Weak<Mutex<GameSession>>, delay: Duration) -> u64 {
        self.epoch += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = session.upgrade() {
                let mut guard = session.lock().await;
                guard.on_timer_fired(epoch).await;
            }
        });
        self.pending = Some(handle);
        epoch
    }

    /// Invalidates any pending timer without arming a new one.
    pub fn cancel(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
