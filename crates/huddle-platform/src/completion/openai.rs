//! Direct OpenAI chat completions client.
//!
//! Sends the configured system prompt plus the user's message and
//! classifies provider error bodies into the exchange taxonomy.
//! Uses browser `fetch()` via gloo-net for WASM compatibility.

use async_trait::async_trait;
use gloo_net::http::Request;
use serde::Deserialize;
use serde_json::{json, Value};

use huddle_core::classify::classify_provider_error;
use huddle_core::ports::CompletionPort;
use huddle_types::{
    config::CompletionConfig,
    exchange::{CompletionRequest, ExchangeError, ExchangeErrorKind},
};

/// Provider client speaking the OpenAI chat completions protocol.
pub struct OpenAiCompletionClient {
    config: CompletionConfig,
}

impl OpenAiCompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url().trim_end_matches('/'))
    }

    pub fn build_request_body(&self, content: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user", "content": content },
            ],
            "temperature": self.config.temperature,
        })
    }
}

#[async_trait(?Send)]
impl CompletionPort for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ExchangeError> {
        let Some(api_key) = request.client_api_key.as_deref() else {
            return Err(ExchangeError::new(
                ExchangeErrorKind::NoApiKey,
                "No OpenAI API key configured",
            ));
        };
        let body = self.build_request_body(&request.content);

        let response = Request::post(&self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", api_key))
            .json(&body)
            .map_err(|e| ExchangeError::server(e.to_string()))?
            .send()
            .await
            .map_err(|e| ExchangeError::server(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::server(e.to_string()))?;

        if !response.ok() {
            return Err(classify_provider_error(status, &text));
        }
        parse_completion(&text)
    }

    fn client_name(&self) -> &str {
        "openai"
    }
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's text out of a 2xx body.
pub fn parse_completion(body: &str) -> Result<String, ExchangeError> {
    let data: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ExchangeError::server(format!("Malformed response: {}", e)))?;
    data.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| ExchangeError::server("No choices in response"))
}
