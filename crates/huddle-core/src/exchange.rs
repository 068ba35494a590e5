//! Message exchange orchestrator — one user turn at a time.
//!
//! A turn runs `Idle → Sending → (Succeeded | DemoResponded | Failed) → Idle`:
//! 1. Append the user message (never rolled back)
//! 2. Resolve a credential; if it is not usable, fabricate a demo reply
//! 3. Otherwise call the completion port and classify the outcome
//! 4. On a reply, append it and persist once the transcript outgrows the
//!    greeting plus one exchange

use std::cell::{Cell, RefCell};
use thiserror::Error;
use huddle_types::{
    event::HuddleEvent,
    exchange::{CompletionRequest, ExchangeError},
    credential::{Credential, CredentialOrigin},
    message::Message,
};
use crate::credentials::CredentialResolver;
use crate::event_bus::EventBus;
use crate::ports::CompletionPort;
use crate::store::ConversationStore;

/// Transcripts with more messages than this are persisted.
pub const PERSIST_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
}

/// A turn that produced an assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub message: Message,
    /// Set when the reply was fabricated instead of fetched
    pub demo: bool,
    /// Id of the persisted session, once there is one
    pub session_id: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    #[error("message cannot be empty")]
    EmptyInput,

    #[error("a turn is already in flight for this session")]
    TurnInFlight,

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub struct ExchangeOrchestrator {
    transcript: RefCell<Vec<Message>>,
    session_id: RefCell<Option<String>>,
    state: Cell<TurnState>,
    turn_counter: Cell<u64>,
    greeting_name: String,
    resolver: CredentialResolver,
    store: ConversationStore,
    event_bus: EventBus,
}

impl ExchangeOrchestrator {
    pub fn new(
        greeting_name: impl Into<String>,
        resolver: CredentialResolver,
        store: ConversationStore,
        event_bus: EventBus,
    ) -> Self {
        let greeting_name = greeting_name.into();
        Self {
            transcript: RefCell::new(vec![Message::greeting(&greeting_name)]),
            session_id: RefCell::new(None),
            state: Cell::new(TurnState::Idle),
            turn_counter: Cell::new(0),
            greeting_name,
            resolver,
            store,
            event_bus,
        }
    }

    /// Run one turn.
    ///
    /// `client_credential` is the device-local key as read by the caller for
    /// this turn. Takes `&self` and never holds a borrow across the remote
    /// call, so a second call while one is pending is rejected with
    /// [`SendError::TurnInFlight`] instead of panicking.
    pub async fn send_message(
        &self,
        input: &str,
        client_credential: Option<&str>,
        completion: &dyn CompletionPort,
    ) -> Result<TurnReply, SendError> {
        let content = input.trim();
        if content.is_empty() {
            return Err(SendError::EmptyInput);
        }
        if self.state.get() == TurnState::Sending {
            return Err(SendError::TurnInFlight);
        }
        let _in_flight = InFlight::enter(&self.state);

        let turn_id = self.turn_counter.get() + 1;
        self.turn_counter.set(turn_id);
        self.event_bus.emit(HuddleEvent::TurnStart { turn_id });

        let user_message = Message::user(content);
        self.transcript.borrow_mut().push(user_message.clone());
        self.event_bus.emit(HuddleEvent::UserMessageAppended { message: user_message });

        let credential = self.resolver.resolve(client_credential);
        let demo = !credential.is_usable();
        let outcome = if demo {
            log::warn!("No usable API key; answering in demo mode");
            Ok(demo_reply(content))
        } else {
            log::debug!("Dispatching turn {} via {}", turn_id, completion.client_name());
            completion.complete(completion_request(content, &credential)).await
        };

        let result = match outcome {
            Ok(text) => {
                let message = Message::assistant(text.clone());
                self.transcript.borrow_mut().push(message.clone());
                self.event_bus.emit(HuddleEvent::ReplyReceived { text, demo });
                let session_id = self.persist();
                Ok(TurnReply { message, demo, session_id })
            }
            Err(e) => {
                log::error!("Turn {} failed: {}", turn_id, e);
                self.event_bus.emit(HuddleEvent::TurnFailed {
                    kind: e.kind,
                    message: e.user_hint(),
                });
                Err(SendError::Exchange(e))
            }
        };

        self.event_bus.emit(HuddleEvent::TurnEnd { turn_id });
        result
    }

    /// Save the transcript on its first qualifying turn, update it after.
    /// Failures are reported, not propagated: the turn already succeeded.
    fn persist(&self) -> Option<String> {
        let messages = self.transcript.borrow().clone();
        let existing = self.session_id.borrow().clone();
        if messages.len() <= PERSIST_THRESHOLD {
            return existing;
        }

        let saved = match existing {
            Some(id) => match self.store.update_session(&id, &messages) {
                Ok(true) => {
                    self.event_bus.emit(HuddleEvent::SessionUpdated { session_id: id.clone() });
                    Ok(id)
                }
                // Deleted from history mid-conversation; start a new record.
                Ok(false) => self.save_new(&messages),
                Err(e) => Err(e),
            },
            None => self.save_new(&messages),
        };

        match saved {
            Ok(id) => {
                *self.session_id.borrow_mut() = Some(id.clone());
                Some(id)
            }
            Err(e) => {
                log::warn!("Could not persist conversation: {}", e);
                self.event_bus.emit(HuddleEvent::PersistFailed { message: e.to_string() });
                self.session_id.borrow().clone()
            }
        }
    }

    fn save_new(&self, messages: &[Message]) -> huddle_types::Result<String> {
        let id = self.store.save_session(messages)?;
        self.event_bus.emit(HuddleEvent::SessionSaved { session_id: id.clone() });
        Ok(id)
    }

    pub fn state(&self) -> TurnState {
        self.state.get()
    }

    /// Snapshot of the transcript in insertion order
    pub fn transcript(&self) -> Vec<Message> {
        self.transcript.borrow().clone()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.borrow().clone()
    }

    /// Start a new conversation with a fresh greeting. Ignored while a turn
    /// is in flight.
    pub fn reset(&self) -> bool {
        if self.state.get() == TurnState::Sending {
            return false;
        }
        *self.transcript.borrow_mut() = vec![Message::greeting(&self.greeting_name)];
        *self.session_id.borrow_mut() = None;
        self.turn_counter.set(0);
        true
    }
}

/// The fabricated reply used when no well-formed credential is available.
pub fn demo_reply(content: &str) -> String {
    format!(
        "This is a demo response to your query: \"{}\"\n\n\
         To use the real AI, please add your OpenAI API key in the settings.",
        content
    )
}

fn completion_request(content: &str, credential: &Credential) -> CompletionRequest {
    CompletionRequest {
        content: content.to_string(),
        client_api_key: match credential.origin() {
            CredentialOrigin::Demo | CredentialOrigin::ServerHeld => None,
            CredentialOrigin::ServerConfigured | CredentialOrigin::ClientSupplied => {
                Some(credential.expose().to_string())
            }
        },
    }
}

/// Holds `Sending` for the lifetime of a turn; drops back to `Idle` even
/// when the caller abandons the turn future.
struct InFlight<'a>(&'a Cell<TurnState>);

impl<'a> InFlight<'a> {
    fn enter(state: &'a Cell<TurnState>) -> Self {
        state.set(TurnState::Sending);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(TurnState::Idle);
    }
}
