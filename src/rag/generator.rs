//! Answer generation backend.
//!
//! The engine talks to the generation service through the `Generator` trait,
//! the same seam shape as `Embedder` and `VectorStore`, so the backend is
//! swappable in tests without a running model server.

use crate::config::GenerationSettings;
use crate::error::{LeseError, Result};
use crate::openai::create_client;
use crate::retry::{with_backoff, RetryConfig};
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

/// Trait for chat completion backends.
///
/// Implementations deliver the answer as a stream of text fragments into
/// `sink` when one is provided, and always return the fully assembled text.
/// A closed sink receiver cancels the turn: the implementation stops and
/// returns `Cancelled` instead of a partial answer.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        sink: Option<&mpsc::Sender<String>>,
    ) -> Result<String>;
}

/// Generator backed by an OpenAI-compatible API (OpenAI or Ollama).
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    retry: RetryConfig,
}

impl OpenAIGenerator {
    /// Create a generator for the configured backend.
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            client: create_client(settings.effective_base_url().as_deref()),
            model: settings.model.clone(),
            temperature: settings.temperature,
            retry: RetryConfig::default(),
        }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        sink: Option<&mpsc::Sender<String>>,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .stream(true)
            .build()
            .map_err(|e| LeseError::Generation(e.to_string()))?;

        let mut stream = with_backoff(&self.retry, || async {
            self.client.chat().create_stream(request.clone()).await.map_err(|e| {
                LeseError::OpenAI(format!("Failed to start generation: {}", e))
            })
        })
        .await?;

        let mut answer = String::new();
        while let Some(result) = stream.next().await {
            let response = result
                .map_err(|e| LeseError::Generation(format!("Generation stream failed: {}", e)))?;
            for choice in &response.choices {
                if let Some(content) = &choice.delta.content {
                    answer.push_str(content);
                    if let Some(sender) = sink {
                        // A closed receiver means the caller walked away.
                        if sender.send(content.clone()).await.is_err() {
                            return Err(LeseError::Cancelled);
                        }
                    }
                }
            }
        }

        if answer.is_empty() {
            return Err(LeseError::Generation("Empty response from model".to_string()));
        }
        Ok(answer)
    }
}
