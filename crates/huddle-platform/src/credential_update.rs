//! Credential update adapters.

use std::rc::Rc;

use async_trait::async_trait;
use gloo_net::http::Request;
use serde::Deserialize;

use huddle_core::ports::CredentialUpdatePort;
use huddle_types::config::CredentialConfig;
use huddle_types::exchange::{
    CredentialUpdateError, CredentialUpdateErrorKind, CredentialUpdateOutcome,
    CredentialUpdateRequest, StorageMethod,
};

/// Posts `{ apiKey }` to the update endpoint.
pub struct HttpCredentialUpdater {
    url: String,
}

impl HttpCredentialUpdater {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait(?Send)]
impl CredentialUpdatePort for HttpCredentialUpdater {
    async fn update_credential(
        &self,
        api_key: &str,
    ) -> Result<CredentialUpdateOutcome, CredentialUpdateError> {
        let body = CredentialUpdateRequest {
            api_key: api_key.to_string(),
        };
        let response = Request::post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .map_err(|e| server_error(e.to_string()))?
            .send()
            .await
            .map_err(|e| server_error(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| server_error(e.to_string()))?;
        decode_update_reply(&text)
    }
}

/// Used when no update endpoint is configured: the key always stays on
/// the device.
pub struct LocalOnlyCredentialUpdater;

#[async_trait(?Send)]
impl CredentialUpdatePort for LocalOnlyCredentialUpdater {
    async fn update_credential(
        &self,
        _api_key: &str,
    ) -> Result<CredentialUpdateOutcome, CredentialUpdateError> {
        Ok(CredentialUpdateOutcome {
            success: true,
            storage_method: StorageMethod::Local,
            message: "API key saved on this device".to_string(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateErrorBody {
    error: String,
    #[serde(default)]
    error_type: Option<String>,
}

/// Decode the update endpoint's reply into an outcome or a typed rejection.
pub fn decode_update_reply(body: &str) -> Result<CredentialUpdateOutcome, CredentialUpdateError> {
    if let Ok(err) = serde_json::from_str::<UpdateErrorBody>(body) {
        return Err(CredentialUpdateError::Rejected {
            kind: err
                .error_type
                .and_then(|t| serde_json::from_value(serde_json::Value::String(t)).ok())
                .unwrap_or(CredentialUpdateErrorKind::ServerError),
            message: err.error,
        });
    }
    match serde_json::from_str::<CredentialUpdateOutcome>(body) {
        Ok(outcome) if outcome.success => Ok(outcome),
        Ok(outcome) => Err(CredentialUpdateError::Rejected {
            kind: CredentialUpdateErrorKind::ServerError,
            message: outcome.message,
        }),
        Err(e) => Err(server_error(format!("Malformed response: {}", e))),
    }
}

fn server_error(message: String) -> CredentialUpdateError {
    CredentialUpdateError::Rejected {
        kind: CredentialUpdateErrorKind::ServerError,
        message,
    }
}

/// Build the updater for the configured endpoint, if any.
pub fn credential_updater(config: &CredentialConfig) -> Rc<dyn CredentialUpdatePort> {
    match config.update_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Rc::new(HttpCredentialUpdater::new(url)),
        None => Rc::new(LocalOnlyCredentialUpdater),
    }
}
