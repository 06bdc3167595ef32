//! In-memory chat history per session id.
//!
//! Histories idle for the configured period are swept whenever a
//! new session id is first seen.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use amitybot_common::ChatTurn;
use tokio::sync::RwLock;
use tracing::debug;

struct History {
    turns: Vec<ChatTurn>,
    last_seen: Instant,
}

pub struct ChatSessions {
    sessions: RwLock<HashMap<String, History>>,
    max_turns: usize,
    idle: Duration,
}

impl ChatSessions {
    pub fn new(max_turns: usize, idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns: max_turns.max(1),
            idle,
        }
    }

    /// History for `session_id`; seeded from `client_history` the first
    /// time the session is seen.
    pub async fn history(&self, session_id: &str, client_history: &[ChatTurn]) -> Vec<ChatTurn> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            self.sweep(&mut sessions);
        }
        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            let skip = client_history.len().saturating_sub(self.max_turns);
            History { turns: client_history[skip..].to_vec(), last_seen: Instant::now() }
        });
        entry.last_seen = Instant::now();
        entry.turns.clone()
    }

    /// Append one exchange, dropping the oldest turns beyond the cap.
    pub async fn append(&self, session_id: &str, turn: ChatTurn) {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            self.sweep(&mut sessions);
        }
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| History { turns: Vec::new(), last_seen: Instant::now() });
        entry.last_seen = Instant::now();
        entry.turns.push(turn);
        if entry.turns.len() > self.max_turns {
            let excess = entry.turns.len() - self.max_turns;
            entry.turns.drain(..excess);
        }
    }

    /// Drop every history idle for at least the configured period.
    pub async fn purge_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions)
    }

    fn sweep(&self, sessions: &mut HashMap<String, History>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, h| h.last_seen.elapsed() < self.idle);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Evicted idle chat sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
