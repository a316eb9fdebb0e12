//! Query-time retrieval: embed, search, rerank, truncate.

use super::rerank::{create_reranker, Reranker, RerankStrategy};
use crate::config::RetrievalSettings;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ScoredCandidate, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Retrieves the chunks most relevant to a query from a collection.
///
/// When reranking is enabled the vector store is over-fetched by
/// `overfetch_factor` so the reranker sees a wider pool than the final
/// top-k it gets cut down to.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    reranker: Box<dyn Reranker>,
    strategy: RerankStrategy,
    top_k: usize,
    overfetch_factor: usize,
    min_score: f32,
}

impl Retriever {
    /// Create a retriever from retrieval settings.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        settings: &RetrievalSettings,
    ) -> Result<Self> {
        let strategy: RerankStrategy =
            settings.rerank.parse().map_err(crate::error::LeseError::Config)?;
        Ok(Self {
            embedder,
            store,
            reranker: create_reranker(strategy),
            strategy,
            top_k: settings.top_k,
            overfetch_factor: settings.overfetch_factor,
            min_score: settings.min_score,
        })
    }

    /// Override the number of results returned.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Override the minimum similarity score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Retrieve the most relevant chunks for a query.
    ///
    /// An empty result is a normal outcome, not an error: it means nothing
    /// in the collection cleared the score threshold.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn retrieve(&self, query: &str, collection: &str) -> Result<Vec<ScoredCandidate>> {
        let query_embedding = self.embedder.embed(query).await?;

        let fetch_k = if self.strategy.is_active() {
            self.top_k.saturating_mul(self.overfetch_factor)
        } else {
            self.top_k
        };

        let candidates = self
            .store
            .query_with_threshold(collection, &query_embedding, fetch_k, self.min_score)
            .await?;
        debug!(candidates = candidates.len(), fetch_k, "vector search complete");

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut ranked = self.reranker.rerank(query, candidates);
        ranked.truncate(self.top_k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkConfig, TextChunker};
    use crate::embedding::test_support::HashEmbedder;
    use crate::vector_store::{MemoryVectorStore, StoredChunk};
    use chrono::Utc;

    const HANDBOOK: &str = "Refund policy. Customers may request a full refund within thirty \
days of purchase. Refunds are processed to the original payment method within five business \
days of approval. Items damaged by misuse are not eligible for a refund.\n\n\
Dress code. Employees are expected to dress in business casual attire on weekdays. Jeans \
are permitted on Fridays. Safety shoes are mandatory on the warehouse floor at all times.\n\n\
Parking. Staff parking is available in lot B. Visitor parking is limited to two hours and \
requires a permit from the front desk.";

    async fn ingest_handbook(embedder: &HashEmbedder, store: &MemoryVectorStore) {
        let chunker = TextChunker::new(ChunkConfig::new(200, 50).unwrap());
        let chunks = chunker.chunk("handbook", HANDBOOK);
        assert!(chunks.len() >= 2);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await.unwrap();

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk {
                chunk,
                document_name: "handbook.txt".to_string(),
                embedding,
                ingested_at: Utc::now(),
            })
            .collect();
        store.upsert_batch("documents", &stored).await.unwrap();
    }

    fn retriever(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        rerank: &str,
    ) -> Retriever {
        let settings = RetrievalSettings {
            top_k: 3,
            overfetch_factor: 2,
            min_score: 0.0,
            rerank: rerank.to_string(),
        };
        Retriever::new(embedder, store, &settings).unwrap()
    }

    #[tokio::test]
    async fn test_refund_question_retrieves_refund_chunk() {
        let embedder = Arc::new(HashEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());
        ingest_handbook(&embedder, &store).await;

        let retriever = retriever(embedder, store, "lexical");
        let results = retriever
            .retrieve("what is the refund policy", "documents")
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(
            results[0].chunk.chunk.content.to_lowercase().contains("refund"),
            "expected refund chunk first, got: {}",
            results[0].chunk.chunk.content
        );
    }

    #[tokio::test]
    async fn test_empty_collection_yields_empty_result() {
        let embedder = Arc::new(HashEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());

        let retriever = retriever(embedder, store, "lexical");
        let results = retriever.retrieve("anything at all", "documents").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_truncation_after_rerank() {
        let embedder = Arc::new(HashEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());
        ingest_handbook(&embedder, &store).await;

        let retriever = retriever(embedder, store, "lexical").with_top_k(1);
        let results = retriever.retrieve("visitor parking permit", "documents").await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].chunk.chunk.content.to_lowercase().contains("parking"));
    }

    #[tokio::test]
    async fn test_min_score_filters_everything() {
        let embedder = Arc::new(HashEmbedder::new());
        let store = Arc::new(MemoryVectorStore::new());
        ingest_handbook(&embedder, &store).await;

        // Nothing clears an impossible threshold.
        let retriever = retriever(embedder, store, "none").with_min_score(2.0);
        let results = retriever.retrieve("refund", "documents").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_a_config_error() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let settings = RetrievalSettings {
            rerank: "bm42".to_string(),
            ..Default::default()
        };
        assert!(Retriever::new(embedder, store, &settings).is_err());
    }
}
