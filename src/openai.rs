//! OpenAI-compatible client configuration with sensible defaults.
//!
//! Both OpenAI and a local Ollama server (which exposes an OpenAI-compatible
//! endpoint under `/v1`) are supported through the same client.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client for the given backend base URL.
///
/// `base_url` of `None` uses the standard OpenAI endpoint and the
/// `OPENAI_API_KEY` environment variable. Uses a 5-minute timeout by default
/// to prevent hung API calls.
pub fn create_client(base_url: Option<&str>) -> Client<OpenAIConfig> {
    create_client_with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    base_url: Option<&str>,
    timeout: Duration,
) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    let mut config = OpenAIConfig::default();
    if let Some(url) = base_url {
        // Ollama ignores the API key but async-openai requires one to be set.
        config = config.with_api_base(url);
        if std::env::var("OPENAI_API_KEY").is_err() {
            config = config.with_api_key("ollama");
        }
    }

    Client::with_config(config).with_http_client(http_client)
}
