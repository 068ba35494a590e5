use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::message::Message;

pub const NEW_CONVERSATION_TITLE: &str = "New conversation";
pub const TITLE_MAX_CHARS: usize = 30;

/// A persisted conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Build a fresh session record. The title is derived here and never
    /// recomputed afterwards.
    pub fn new(id: String, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: derive_title(&messages),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the transcript and refresh `updated_at`. Title and
    /// `created_at` are left alone.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.updated_at = Utc::now().max(self.created_at);
    }

    /// Case-insensitive match against the title or any message body.
    /// An empty term matches everything.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .messages
                .iter()
                .any(|m| m.content.to_lowercase().contains(&needle))
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
            message_count: self.messages.len(),
            preview: self
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        }
    }
}

/// Title from the first user message: its first 30 characters, with `...`
/// appended when it was cut.
pub fn derive_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|m| m.is_user()) else {
        return NEW_CONVERSATION_TITLE.to_string();
    };
    let mut chars = first.content.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Summary of a session for listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
}
