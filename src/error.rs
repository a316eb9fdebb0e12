//! Error types for Lese.

use thiserror::Error;

/// Library-level error type for Lese operations.
#[derive(Error, Debug)]
pub enum LeseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Turn cancelled before completion")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LeseError {
    /// Whether a retry against the external service might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LeseError::ServiceUnavailable(_) => true,
            LeseError::Http(e) => e.is_timeout() || e.is_connect(),
            LeseError::OpenAI(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("timeout")
                    || msg.contains("timed out")
                    || msg.contains("connection")
                    || msg.contains("rate limit")
                    || msg.contains("too many requests")
                    || msg.contains("overloaded")
                    || msg.contains("503")
                    || msg.contains("429")
            }
            _ => false,
        }
    }
}

/// Result type alias for Lese operations.
pub type Result<T> = std::result::Result<T, LeseError>;
