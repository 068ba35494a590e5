//! Boundary decoding of remote replies into the exchange error taxonomy.
//!
//! Nothing untyped crosses this module: callers get either reply text or an
//! [`ExchangeError`] with a closed kind.

use serde::Deserialize;
use huddle_types::exchange::{
    CompletionResponse, ExchangeError, ExchangeErrorKind, RemoteErrorPayload,
};

/// Decode a relay reply (`{ response }` or `{ error, errorType }`).
///
/// A body carrying `error` is a failure even under a 2xx status. Unknown or
/// missing `errorType` on a structured error is `API_ERROR`; anything that
/// does not parse is `SERVER_ERROR`.
pub fn decode_relay_reply(status: u16, body: &str) -> Result<String, ExchangeError> {
    if let Ok(payload) = serde_json::from_str::<RemoteErrorPayload>(body) {
        let kind = payload
            .error_type
            .as_deref()
            .and_then(ExchangeErrorKind::from_wire)
            .unwrap_or(ExchangeErrorKind::ApiError);
        return Err(ExchangeError::new(kind, payload.error));
    }

    if !(200..300).contains(&status) {
        return Err(ExchangeError::server(format!(
            "HTTP {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        )));
    }

    serde_json::from_str::<CompletionResponse>(body)
        .map(|r| r.response)
        .map_err(|e| ExchangeError::server(format!("Malformed response: {}", e)))
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

const PROVIDER_FALLBACK_MESSAGE: &str = "Error connecting to OpenAI API";

/// Classify a non-2xx reply from the provider's chat completions API.
pub fn classify_provider_error(status: u16, body: &str) -> ExchangeError {
    let Ok(ProviderErrorBody { error }) = serde_json::from_str::<ProviderErrorBody>(body) else {
        log::debug!("Unstructured provider error (HTTP {})", status);
        return ExchangeError::new(ExchangeErrorKind::ApiError, PROVIDER_FALLBACK_MESSAGE);
    };

    let tagged = |tag: &str| {
        error.error_type.as_deref() == Some(tag) || error.code.as_deref() == Some(tag)
    };
    let lowered = error.message.to_lowercase();

    if tagged("insufficient_quota") || lowered.contains("exceeded your current quota") {
        ExchangeError::new(
            ExchangeErrorKind::QuotaExceeded,
            "You have exceeded your OpenAI API quota. Please check your billing details \
             or update your API key.",
        )
    } else if tagged("invalid_api_key")
        || lowered.contains("invalid api key")
        || lowered.contains("incorrect api key")
    {
        ExchangeError::new(
            ExchangeErrorKind::InvalidApiKey,
            "The provided API key is invalid. Please update your API key in the settings.",
        )
    } else if error.message.is_empty() {
        ExchangeError::new(ExchangeErrorKind::ApiError, PROVIDER_FALLBACK_MESSAGE)
    } else {
        ExchangeError::new(ExchangeErrorKind::ApiError, error.message)
    }
}
