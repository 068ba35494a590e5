//! Conversation store — CRUD over persisted sessions.
//!
//! All sessions live in one JSON array under a single key. Every write
//! rewrites the whole collection; there is no in-place patching.

use std::rc::Rc;
use huddle_types::{
    HuddleError, Result,
    message::Message,
    session::{ConversationSession, SessionSummary},
};
use crate::ports::KeyValuePort;

#[derive(Clone)]
pub struct ConversationStore {
    storage: Rc<dyn KeyValuePort>,
    key: String,
}

impl ConversationStore {
    pub fn new(storage: Rc<dyn KeyValuePort>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Persist a transcript as a new session and return its id.
    pub fn save_session(&self, messages: &[Message]) -> Result<String> {
        let mut sessions = self.load()?;
        let id = format!("chat-{}", uuid::Uuid::new_v4());
        let session = ConversationSession::new(id.clone(), messages.to_vec());
        log::info!("Saving session {} ({:?})", id, session.title);
        sessions.push(session);
        self.persist(&sessions)?;
        Ok(id)
    }

    /// Rewrite the transcript of an existing session. Title and `created_at`
    /// stay as they were. Returns `false` when the id is unknown.
    pub fn update_session(&self, id: &str, messages: &[Message]) -> Result<bool> {
        let mut sessions = self.load()?;
        let Some(session) = sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        session.replace_messages(messages.to_vec());
        self.persist(&sessions)?;
        log::debug!("Updated session {}", id);
        Ok(true)
    }

    /// All sessions in storage order. Empty when nothing was ever saved.
    pub fn get_all_sessions(&self) -> Result<Vec<ConversationSession>> {
        self.load()
    }

    pub fn get_session_by_id(&self, id: &str) -> Result<Option<ConversationSession>> {
        Ok(self.load()?.into_iter().find(|s| s.id == id))
    }

    /// Returns whether a record was actually removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        let mut sessions = self.load()?;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.persist(&sessions)?;
        log::info!("Deleted session {}", id);
        Ok(true)
    }

    /// Sessions whose title or any message contains `term`
    /// (case-insensitive), most recently updated first.
    pub fn search_sessions(&self, term: &str) -> Result<Vec<ConversationSession>> {
        let mut hits: Vec<ConversationSession> = self
            .load()?
            .into_iter()
            .filter(|s| s.matches(term))
            .collect();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(hits)
    }

    /// History list rows for `term`, in [`search_sessions`](Self::search_sessions)
    /// order. An empty term lists everything.
    pub fn list_summaries(&self, term: &str) -> Result<Vec<SessionSummary>> {
        Ok(self.search_sessions(term)?.iter().map(ConversationSession::summary).collect())
    }

    fn load(&self) -> Result<Vec<ConversationSession>> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| HuddleError::CorruptStorage {
            key: self.key.clone(),
            message: e.to_string(),
        })
    }

    fn persist(&self, sessions: &[ConversationSession]) -> Result<()> {
        let json = serde_json::to_string(sessions)?;
        self.storage.set(&self.key, &json)
    }
}
