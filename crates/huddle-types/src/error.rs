use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HuddleError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt data under '{key}': {message}")]
    CorruptStorage { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for HuddleError {
    fn from(e: serde_json::Error) -> Self {
        HuddleError::Serialization(e.to_string())
    }
}
