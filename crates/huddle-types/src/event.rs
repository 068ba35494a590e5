use serde::{Deserialize, Serialize};
use crate::exchange::{ExchangeErrorKind, StorageMethod};
use crate::message::Message;

/// Events emitted by the exchange orchestrator and credential actions.
/// The UI drains these for reactive updates and transient notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HuddleEvent {
    /// A turn entered `Sending`
    TurnStart { turn_id: u64 },

    /// The turn was accepted and the user message is in the transcript
    UserMessageAppended { message: Message },

    /// An assistant message was appended. `demo` marks fabricated replies.
    ReplyReceived { text: String, demo: bool },

    /// The turn failed; no assistant message was appended
    TurnFailed {
        kind: ExchangeErrorKind,
        message: String,
    },

    /// The turn is over and input may be re-enabled
    TurnEnd { turn_id: u64 },

    /// The transcript was persisted for the first time
    SessionSaved { session_id: String },

    /// An already persisted transcript was rewritten
    SessionUpdated { session_id: String },

    /// Persisting the transcript failed; the turn itself still succeeded
    PersistFailed { message: String },

    /// The API key was changed; callers decide how to refresh
    CredentialUpdated { storage_method: StorageMethod },

    /// The device-local API key was removed
    CredentialCleared,
}
