//! Per-session conversation state.
//!
//! Each session id maps to its own lock. A turn holds its session's lock
//! from start to finish, so turns of one session run one after another
//! while different sessions never wait on each other.

use crate::memory::SessionMemory;
use dashmap::DashMap;
use pipeline::PendingClarification;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything remembered about one session between turns
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub memory: SessionMemory,
    /// Candidates offered in the last clarification, until the user picks
    pub pending: Option<PendingClarification>,
    /// Last message that was not a pick
    pub last_question: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    sessions: DashMap<String, Arc<Mutex<Conversation>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's conversation, created on first use
    pub fn handle(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Copy of a session's state, if it exists
    pub async fn snapshot(&self, session_id: &str) -> Option<Conversation> {
        let handle = self.sessions.get(session_id).map(|h| h.value().clone())?;
        let conversation = handle.lock().await;
        Some(conversation.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
