//! Error types shared across the BevGenie core.

use std::time::Duration;

/// Result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, GenieError>;

/// Failures of the language-model capability (chat completion or embeddings).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model API key is not configured")]
    MissingApiKey,

    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("language model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("language model API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model response could not be parsed: {0}")]
    Parse(String),

    #[error("language model returned an empty completion")]
    EmptyCompletion,
}

#[derive(Debug, thiserror::Error)]
pub enum GenieError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("knowledge retrieval failed: {0}")]
    Knowledge(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("presentation generation failed: {0}")]
    Presentation(String),
}
