//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::error::{LeseError, Result};
use crate::openai::create_client;
use crate::retry::{with_backoff, RetryConfig};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by an OpenAI-compatible API (OpenAI or Ollama).
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
    retry: RetryConfig,
}

impl OpenAIEmbedder {
    /// Create an embedder for the given backend, model and dimensionality.
    ///
    /// `base_url` of `None` targets the OpenAI API.
    pub fn new(base_url: Option<&str>, model: &str, dimensions: usize) -> Self {
        Self {
            client: create_client(base_url),
            model: model.to_string(),
            dimensions,
            batch_size: 64,
            retry: RetryConfig::default(),
        }
    }

    /// Set the number of texts sent per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_one_batch(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(input))
            .build()
            .map_err(|e| LeseError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| LeseError::OpenAI(format!("Embedding API error: {}", e)))?;

        // Sort by index to ensure correct order
        let mut data: Vec<_> = response.data.into_iter().collect();
        data.sort_by_key(|e| e.index);

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            // A wrong-sized vector means the configured model does not match
            // what the collection was built with; storing it would corrupt
            // the index, so fail loudly instead.
            if item.embedding.len() != self.dimensions {
                return Err(LeseError::Embedding(format!(
                    "Model '{}' returned {}-dimensional vectors, expected {}. \
                     Check the embedding model and dimensions settings.",
                    self.model,
                    item.embedding.len(),
                    self.dimensions
                )));
            }
            embeddings.push(item.embedding);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LeseError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let batch =
                with_backoff(&self.retry, || self.embed_one_batch(chunk.to_vec())).await?;

            if batch.len() != chunk.len() {
                return Err(LeseError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    batch.len()
                )));
            }
            all_embeddings.extend(batch);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
