//! UI-level state that drives rendering.
//! A read-only projection of the orchestrator, updated each frame by
//! draining the EventBus.

use huddle_types::event::HuddleEvent;
use huddle_types::exchange::{ExchangeErrorKind, StorageMethod};
use huddle_types::message::{Message, Sender};
use huddle_types::session::{ConversationSession, SessionSummary};

/// State visible to UI panels
pub struct UiState {
    /// Displayed transcript
    pub messages: Vec<ChatEntry>,
    /// A turn is in flight; input is disabled
    pub busy: bool,
    /// Status line text
    pub status_text: String,
    /// Last failed turn, shown above the input until the next turn starts
    pub error_banner: Option<ErrorBanner>,
    /// Transient notification (key updated, save failed, ...)
    pub notice: Option<String>,
    /// Input field content
    pub input_text: String,
    /// API key field in settings; cleared after a successful update
    pub api_key_input: String,
    /// Whether settings panel is open
    pub show_settings: bool,
    pub view: View,
    /// History rows for `search_term`, as last loaded from the store
    pub history: Vec<SessionSummary>,
    pub search_term: String,
    /// Session opened in the history view
    pub selected: Option<ConversationSession>,
    /// The stored history or the search term changed since the last load
    pub history_stale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Chat,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A chat entry for display
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    /// Fabricated reply; rendered with a demo badge
    pub demo: bool,
}

impl From<&Message> for ChatEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: match message.sender {
                Sender::User => Role::User,
                Sender::Assistant => Role::Assistant,
            },
            content: message.content.clone(),
            demo: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorBanner {
    pub kind: ExchangeErrorKind,
    pub message: String,
}

impl ErrorBanner {
    pub fn title(&self) -> &'static str {
        match self.kind {
            ExchangeErrorKind::QuotaExceeded => "Quota exceeded",
            ExchangeErrorKind::InvalidApiKey => "Invalid API key",
            ExchangeErrorKind::NoApiKey => "No API key",
            ExchangeErrorKind::ApiError => "API error",
            ExchangeErrorKind::ServerError => "Connection problem",
        }
    }

    /// Credential problems are fixed in settings, not by retrying.
    pub fn points_to_settings(&self) -> bool {
        matches!(
            self.kind,
            ExchangeErrorKind::QuotaExceeded
                | ExchangeErrorKind::InvalidApiKey
                | ExchangeErrorKind::NoApiKey
        )
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            busy: false,
            status_text: "Ready".to_string(),
            error_banner: None,
            notice: None,
            input_text: String::new(),
            api_key_input: String::new(),
            show_settings: false,
            view: View::Chat,
            history: Vec::new(),
            search_term: String::new(),
            selected: None,
            history_stale: true,
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<HuddleEvent>) {
        for event in events {
            match event {
                HuddleEvent::TurnStart { .. } => {
                    self.busy = true;
                    self.error_banner = None;
                    self.status_text = "Thinking...".to_string();
                }
                HuddleEvent::UserMessageAppended { message } => {
                    self.messages.push(ChatEntry::from(&message));
                }
                HuddleEvent::ReplyReceived { text, demo } => {
                    self.messages.push(ChatEntry {
                        role: Role::Assistant,
                        content: text,
                        demo,
                    });
                }
                HuddleEvent::TurnFailed { kind, message } => {
                    self.status_text = format!("Error: {}", kind.as_wire());
                    self.error_banner = Some(ErrorBanner { kind, message });
                }
                HuddleEvent::TurnEnd { .. } => {
                    self.busy = false;
                    if self.error_banner.is_none() {
                        self.status_text = "Ready".to_string();
                    }
                }
                HuddleEvent::SessionSaved { .. } | HuddleEvent::SessionUpdated { .. } => {
                    self.history_stale = true;
                }
                HuddleEvent::PersistFailed { message } => {
                    self.notice = Some(format!("Conversation not saved: {}", message));
                }
                HuddleEvent::CredentialUpdated { storage_method } => {
                    self.api_key_input.clear();
                    self.notice = Some(match storage_method {
                        StorageMethod::Secret => "API key updated on the server".to_string(),
                        StorageMethod::Local => "API key saved on this device".to_string(),
                    });
                }
                HuddleEvent::CredentialCleared => {
                    self.notice = Some("API key removed from this device".to_string());
                }
            }
        }
    }

    /// Replace the displayed transcript, e.g. after starting a new chat.
    pub fn load_transcript(&mut self, messages: &[Message]) {
        self.messages = messages.iter().map(ChatEntry::from).collect();
        self.error_banner = None;
        self.status_text = "Ready".to_string();
    }

    pub fn set_history(&mut self, summaries: Vec<SessionSummary>) {
        self.history = summaries;
        self.history_stale = false;
    }

    /// Forget the open session if it is `id`, e.g. after deleting it.
    pub fn close_session(&mut self, id: &str) {
        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            self.selected = None;
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
