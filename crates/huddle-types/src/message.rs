use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Older collections stored assistant replies as `bot`.
    #[serde(alias = "bot")]
    Assistant,
}

impl Sender {
    fn id_prefix(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "bot",
        }
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            id: message_id(sender, timestamp),
            content: content.into(),
            sender,
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    /// The seeded greeting every conversation starts with.
    pub fn greeting(display_name: &str) -> Self {
        let name = if display_name.trim().is_empty() {
            "Manager"
        } else {
            display_name.trim()
        };
        Self {
            id: GREETING_ID.to_string(),
            content: format!(
                "Hello {}! I'm your eSports team management assistant. How can I help you today?",
                name
            ),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

pub const GREETING_ID: &str = "welcome";

// Time-prefixed so ids sort roughly by creation; the random tail keeps two
// messages created in the same millisecond apart.
fn message_id(sender: Sender, timestamp: DateTime<Utc>) -> String {
    let tail = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        sender.id_prefix(),
        timestamp.timestamp_millis(),
        &tail[..8]
    )
}
