//! Wire shapes for the completion and credential-update calls, and the
//! closed error taxonomy remote failures are decoded into.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::error::HuddleError;

// ─── Completion call ─────────────────────────────────────────

/// Request body of the completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client_api_key: Option<String>,
}

/// Success body of the completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub response: String,
}

/// Error body of the completion call, as it arrives on the wire.
/// `error_type` stays a string here; [`ExchangeErrorKind::from_wire`]
/// closes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorPayload {
    pub error: String,
    #[serde(default)]
    pub error_type: Option<String>,
}

/// Failure categories of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeErrorKind {
    QuotaExceeded,
    InvalidApiKey,
    NoApiKey,
    ApiError,
    ServerError,
}

impl ExchangeErrorKind {
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "QUOTA_EXCEEDED" => Some(Self::QuotaExceeded),
            "INVALID_API_KEY" => Some(Self::InvalidApiKey),
            "NO_API_KEY" => Some(Self::NoApiKey),
            "API_ERROR" => Some(Self::ApiError),
            "SERVER_ERROR" => Some(Self::ServerError),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::NoApiKey => "NO_API_KEY",
            Self::ApiError => "API_ERROR",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

/// A classified, user-displayable exchange failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {}", .kind.as_wire(), .message)]
pub struct ExchangeError {
    pub kind: ExchangeErrorKind,
    pub message: String,
}

impl ExchangeError {
    pub fn new(kind: ExchangeErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ExchangeErrorKind::ServerError, message)
    }

    /// What to tell the user. `API_ERROR` passes the remote message through.
    pub fn user_hint(&self) -> String {
        match self.kind {
            ExchangeErrorKind::QuotaExceeded => "API quota exceeded. Please check your OpenAI account \
                billing or update your API key in settings."
                .to_string(),
            ExchangeErrorKind::InvalidApiKey => {
                "The API key appears to be invalid. Please update your API key in settings."
                    .to_string()
            }
            ExchangeErrorKind::NoApiKey => "No API key found. Please add your OpenAI API key in \
                settings before using the chatbot."
                .to_string(),
            ExchangeErrorKind::ApiError => self.message.clone(),
            ExchangeErrorKind::ServerError => {
                "Failed to get a response. Please try again.".to_string()
            }
        }
    }
}

// ─── Credential update call ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdateRequest {
    pub api_key: String,
}

/// Where the update call put the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMethod {
    /// Stored as a server-side secret
    Secret,
    /// The caller must keep it in device-local storage
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdateOutcome {
    pub success: bool,
    pub storage_method: StorageMethod,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialUpdateErrorKind {
    ConfigError,
    SecretUpdateError,
    ServerError,
}

#[derive(Error, Debug, Clone)]
pub enum CredentialUpdateError {
    #[error("{message}")]
    Rejected {
        kind: CredentialUpdateErrorKind,
        message: String,
    },

    #[error("could not store the key on this device: {0}")]
    LocalStore(#[from] HuddleError),
}
