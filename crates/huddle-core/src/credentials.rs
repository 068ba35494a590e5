//! Credential resolution and the device-local fallback key.
//!
//! Resolution order: server-configured → server-held secret →
//! client-supplied → placeholder. The first non-empty, well-formed value
//! wins. Resolution never writes.

use std::rc::Rc;
use huddle_types::{
    Result,
    credential::{self, Credential, CredentialOrigin},
    event::HuddleEvent,
    exchange::{CredentialUpdateError, StorageMethod},
};
use crate::event_bus::EventBus;
use crate::ports::{CredentialUpdatePort, KeyValuePort, ServerCredentialSource};

/// Read/write access to the single device-local API key.
#[derive(Clone)]
pub struct LocalCredentialStore {
    storage: Rc<dyn KeyValuePort>,
    key: String,
}

impl LocalCredentialStore {
    pub fn new(storage: Rc<dyn KeyValuePort>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Current local key, re-read from storage on every call.
    /// A read failure counts as "no local key".
    pub fn local_credential(&self) -> Option<String> {
        match self.storage.get(&self.key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                log::warn!("Could not read local API key: {}", e);
                None
            }
        }
    }

    pub fn set_local_credential(&self, api_key: &str) -> Result<()> {
        self.storage.set(&self.key, api_key.trim())
    }

    pub fn clear_local_credential(&self) -> Result<()> {
        self.storage.remove(&self.key)
    }
}

/// Server-side credential as far as this client knows it: a key from
/// deployment config, and whether the update endpoint has stored a secret.
/// The secret marker is persisted so it survives reloads.
#[derive(Clone)]
pub struct ServerCredentialState {
    configured: Option<String>,
    storage: Rc<dyn KeyValuePort>,
    marker_key: String,
}

impl ServerCredentialState {
    pub fn new(
        configured: Option<String>,
        storage: Rc<dyn KeyValuePort>,
        marker_key: impl Into<String>,
    ) -> Self {
        Self {
            configured,
            storage,
            marker_key: marker_key.into(),
        }
    }

    pub fn mark_secret_held(&self) -> Result<()> {
        self.storage.set(&self.marker_key, "1")
    }
}

impl ServerCredentialSource for ServerCredentialState {
    fn server_credential(&self) -> Option<String> {
        self.configured.clone()
    }

    fn holds_secret(&self) -> bool {
        match self.storage.get(&self.marker_key) {
            Ok(value) => value.is_some(),
            Err(e) => {
                log::warn!("Could not read server secret marker: {}", e);
                false
            }
        }
    }
}

pub struct CredentialResolver {
    server: Rc<dyn ServerCredentialSource>,
}

impl CredentialResolver {
    pub fn new(server: Rc<dyn ServerCredentialSource>) -> Self {
        Self { server }
    }

    pub fn resolve(&self, client_credential: Option<&str>) -> Credential {
        let configured = self.server.server_credential();
        if let Some(server) = well_formed(configured.as_deref(), CredentialOrigin::ServerConfigured) {
            return server;
        }
        if self.server.holds_secret() {
            return Credential::server_held();
        }
        well_formed(client_credential, CredentialOrigin::ClientSupplied)
            .unwrap_or_else(Credential::placeholder)
    }
}

fn well_formed(value: Option<&str>, origin: CredentialOrigin) -> Option<Credential> {
    let value = value?.trim();
    if credential::is_well_formed(value) {
        return Some(Credential::new(value, origin));
    }
    if !value.is_empty() {
        log::debug!("Skipping malformed {:?} credential", origin);
    }
    None
}

/// Run the credential update call and record where the key now lives: on
/// the device, or as a server secret the relay will use. Emits
/// `CredentialUpdated` on success.
pub async fn apply_credential_update(
    updater: &dyn CredentialUpdatePort,
    api_key: &str,
    local: &LocalCredentialStore,
    server: &ServerCredentialState,
    event_bus: &EventBus,
) -> std::result::Result<StorageMethod, CredentialUpdateError> {
    let api_key = api_key.trim();
    let outcome = updater.update_credential(api_key).await?;
    match outcome.storage_method {
        StorageMethod::Local => local.set_local_credential(api_key)?,
        StorageMethod::Secret => server.mark_secret_held()?,
    }
    log::info!("API key updated (storage: {:?})", outcome.storage_method);
    event_bus.emit(HuddleEvent::CredentialUpdated {
        storage_method: outcome.storage_method,
    });
    Ok(outcome.storage_method)
}

/// Remove the device-local key. Emits `CredentialCleared`.
pub fn clear_credential(local: &LocalCredentialStore, event_bus: &EventBus) -> Result<()> {
    local.clear_local_credential()?;
    log::info!("Local API key cleared");
    event_bus.emit(HuddleEvent::CredentialCleared);
    Ok(())
}
