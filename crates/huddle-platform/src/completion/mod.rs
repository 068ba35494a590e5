pub mod relay;
pub mod openai;

pub use relay::RelayCompletionClient;
pub use openai::OpenAiCompletionClient;

use std::rc::Rc;
use huddle_core::ports::CompletionPort;
use huddle_types::config::{CompletionBackend, CompletionConfig};

/// Build the completion client selected in config.
pub fn completion_client(config: &CompletionConfig) -> Rc<dyn CompletionPort> {
    match config.backend {
        CompletionBackend::Relay => Rc::new(RelayCompletionClient::new(config.relay_url.clone())),
        CompletionBackend::Direct => Rc::new(OpenAiCompletionClient::new(config.clone())),
    }
}
