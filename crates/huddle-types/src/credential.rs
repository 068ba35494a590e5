use std::fmt;
use serde::{Deserialize, Serialize};

/// Prefix every provider-issued key starts with.
pub const PROVIDER_KEY_PREFIX: &str = "sk-";

/// Stand-in used when nothing better resolves. It can never pass
/// [`is_well_formed`].
pub const PLACEHOLDER_CREDENTIAL: &str = "demo-sk-1234567890";

/// Where the active credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialOrigin {
    ServerConfigured,
    /// Stored server-side by the update endpoint; the value never reaches
    /// the client, the relay supplies it.
    ServerHeld,
    ClientSupplied,
    Demo,
}

/// The credential picked for one request attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    origin: CredentialOrigin,
}

impl Credential {
    pub fn new(value: impl Into<String>, origin: CredentialOrigin) -> Self {
        Self { value: value.into(), origin }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_CREDENTIAL, CredentialOrigin::Demo)
    }

    /// Marker for a key only the relay can see.
    pub fn server_held() -> Self {
        Self::new(String::new(), CredentialOrigin::ServerHeld)
    }

    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> CredentialOrigin {
        self.origin
    }

    pub fn is_well_formed(&self) -> bool {
        is_well_formed(&self.value)
    }

    /// Whether a real completion can be attempted with this credential.
    pub fn is_usable(&self) -> bool {
        self.origin == CredentialOrigin::ServerHeld || self.is_well_formed()
    }
}

// Keep secrets out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &mask(&self.value))
            .field("origin", &self.origin)
            .finish()
    }
}

/// Syntactic check only: the provider prefix followed by at least one
/// non-whitespace character, and no whitespace anywhere.
pub fn is_well_formed(value: &str) -> bool {
    match value.strip_prefix(PROVIDER_KEY_PREFIX) {
        Some(rest) => !rest.is_empty() && !value.chars().any(char::is_whitespace),
        None => false,
    }
}

/// `sk-a…wxyz` style rendering for display.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
