use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    pub completion: CompletionConfig,
    pub credentials: CredentialConfig,
    pub storage: StorageConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub backend: CompletionBackend,
    /// Endpoint speaking the `{ content, clientApiKey }` contract
    pub relay_url: String,
    /// Overrides the provider base URL for `Direct`
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            backend: CompletionBackend::Relay,
            relay_url: "/functions/v1/chat".to_string(),
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn base_url(&self) -> &str {
        self.api_base.as_deref().unwrap_or(OPENAI_BASE_URL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionBackend {
    /// Talk to a relay endpoint that holds the server-side key
    Relay,
    /// Call the provider's chat completions API from the client
    Direct,
}

impl CompletionBackend {
    pub fn all() -> &'static [CompletionBackend] {
        &[CompletionBackend::Relay, CompletionBackend::Direct]
    }

    pub fn label(&self) -> &str {
        match self {
            CompletionBackend::Relay => "Relay",
            CompletionBackend::Direct => "Direct (OpenAI)",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Key provisioned out-of-band for this deployment
    pub server_api_key: Option<String>,
    /// Credential update endpoint. Without one, updates stay on the device.
    pub update_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
    pub history_key: String,
    pub credential_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
            history_key: "chatHistory".to_string(),
            credential_key: "openai_api_key".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Name used in the seeded greeting
    pub display_name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            display_name: "Manager".to_string(),
        }
    }
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert eSports team management assistant. \
You provide strategic advice about team composition, practice schedules, tournament \
preparation, player development, and other aspects of managing a professional eSports team. \
Keep your responses focused on eSports management and be concise but informative.";
