//! Relay client for the `{ content, clientApiKey }` completion contract.
//!
//! The relay holds its own server-side key and falls back to the key the
//! client forwards.

use async_trait::async_trait;
use gloo_net::http::Request;

use huddle_core::classify::decode_relay_reply;
use huddle_core::ports::CompletionPort;
use huddle_types::exchange::{CompletionRequest, ExchangeError};

pub struct RelayCompletionClient {
    url: String,
}

impl RelayCompletionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait(?Send)]
impl CompletionPort for RelayCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ExchangeError> {
        let response = Request::post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .map_err(|e| ExchangeError::server(e.to_string()))?
            .send()
            .await
            .map_err(|e| ExchangeError::server(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::server(e.to_string()))?;
        decode_relay_reply(status, &text)
    }

    fn client_name(&self) -> &str {
        "relay"
    }
}
