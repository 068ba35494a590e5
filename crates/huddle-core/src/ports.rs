//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `huddle-core` (pure Rust).
//! Implementations live in `huddle-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use huddle_types::{
    Result,
    exchange::{
        CompletionRequest, CredentialUpdateError, CredentialUpdateOutcome, ExchangeError,
    },
};

// ─── Key-Value Storage Port ──────────────────────────────────

/// Device-local string storage (`localStorage` in the browser).
///
/// Synchronous on purpose: store and credential operations complete before
/// the next step of a turn proceeds.
pub trait KeyValuePort {
    /// Get a value by key. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Completion Port ─────────────────────────────────────────

/// The remote completion service.
#[async_trait(?Send)]
pub trait CompletionPort {
    /// Send one user message and return the reply text. Every failure is
    /// already classified into the exchange taxonomy.
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, ExchangeError>;

    /// Name of this client (for logging/debug)
    fn client_name(&self) -> &str;
}

// ─── Credential Ports ────────────────────────────────────────

/// Source of the out-of-band, server-configured credential.
pub trait ServerCredentialSource {
    fn server_credential(&self) -> Option<String>;

    /// The update endpoint stored a key as a server secret. Its value is
    /// never visible here.
    fn holds_secret(&self) -> bool {
        false
    }
}

/// A fixed server credential, e.g. from deployment config.
#[derive(Debug, Clone, Default)]
pub struct StaticServerCredential(pub Option<String>);

impl ServerCredentialSource for StaticServerCredential {
    fn server_credential(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The credential update call.
#[async_trait(?Send)]
pub trait CredentialUpdatePort {
    async fn update_credential(
        &self,
        api_key: &str,
    ) -> std::result::Result<CredentialUpdateOutcome, CredentialUpdateError>;
}
