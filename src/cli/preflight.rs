//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is in place before starting
//! operations that would otherwise fail midway through a pipeline.

use crate::config::{GenerationProvider, Settings};
use crate::error::{LeseError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion requires an embedding backend.
    Ingest,
    /// Asking questions requires both embedding and generation backends.
    Ask,
    /// Search requires an embedding backend.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search => {
            check_backend_credentials(settings)?;
        }
    }
    Ok(())
}

/// The OpenAI provider needs a real API key; a local Ollama server does not.
fn check_backend_credentials(settings: &Settings) -> Result<()> {
    if settings.generation.provider != GenerationProvider::OpenAI {
        return Ok(());
    }
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(LeseError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(LeseError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
