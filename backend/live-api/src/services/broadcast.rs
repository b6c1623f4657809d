use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::models::error::GameError;
use crate::models::event::SessionEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Per-session fan-out. Each live session owns one broadcast channel;
/// sockets subscribe here and every event published by the session
/// reaches all current subscribers in publish order.
pub struct BroadcastHub {
    channels: RwLock<HashMap<String, broadcast::Sender<SessionEvent>>>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Creates the channel for a new session and hands back the sender
    /// the session publishes on. Idempotent per session id.
    pub async fn register(&self, session_id: &str) -> broadcast::Sender<SessionEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<SessionEvent>, GameError> {
        let channels = self.channels.read().await;
        channels
            .get(session_id)
            .map(|tx| tx.subscribe())
            .ok_or(GameError::SessionNotFound)
    }

    /// Tears the channel down with its session. Subscribers see the
    /// stream close.
    pub async fn remove(&self, session_id: &str) {
        self.channels.write().await.remove(session_id);
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}
