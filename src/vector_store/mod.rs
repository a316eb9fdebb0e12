//! Vector store abstraction for Lese.
//!
//! Provides a trait-based interface for different vector database backends.
//! All operations are scoped to a named collection: a query against one
//! collection never returns chunks ingested into another.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chunk stored in the vector database together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// The chunk text and provenance metadata.
    pub chunk: Chunk,
    /// Origin file name of the source document, for citation display.
    pub document_name: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub ingested_at: DateTime<Utc>,
}

impl StoredChunk {
    /// Pair a chunk with its embedding.
    pub fn new(chunk: Chunk, document_name: String, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            document_name,
            embedding,
            ingested_at: Utc::now(),
        }
    }

    /// Human-readable source label, e.g. "handbook.txt (page 3)".
    pub fn source_label(&self) -> String {
        match self.chunk.page {
            Some(page) => format!("{} (page {})", self.document_name, page),
            None => self.document_name.clone(),
        }
    }
}

/// Transient result of a retrieval query.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// The matched chunk.
    pub chunk: StoredChunk,
    /// Similarity score under the store's metric (higher is better).
    pub score: f32,
    /// Score assigned by the reranker, if one ran.
    pub rerank_score: Option<f32>,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Document id.
    pub document_id: String,
    /// Origin file name.
    pub document_name: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the document was last ingested.
    pub ingested_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
///
/// Tie-breaking: when candidates share a similarity score, implementations
/// keep them in insertion order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store chunk/embedding pairs under a collection, keyed by chunk id.
    /// Replacing an existing chunk id overwrites text, metadata and vector
    /// together.
    async fn upsert_batch(&self, collection: &str, chunks: &[StoredChunk]) -> Result<usize>;

    /// Remove all chunks of a document from a collection. Returns the number
    /// of chunks removed; zero for an unknown document.
    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<usize>;

    /// Return up to `k` candidates ordered by descending cosine similarity.
    /// An empty or nonexistent collection yields an empty result.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        self.query_with_threshold(collection, embedding, k, f32::MIN).await
    }

    /// Like `query`, dropping candidates below `min_score`.
    async fn query_with_threshold(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>>;

    /// List all documents in a collection.
    async fn list_documents(&self, collection: &str) -> Result<Vec<IndexedDocument>>;

    /// Get a specific document's summary.
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<IndexedDocument>>;

    /// Check whether a document has chunks in a collection.
    async fn is_document_indexed(&self, collection: &str, document_id: &str) -> Result<bool> {
        Ok(self.get_document(collection, document_id).await?.is_some())
    }

    /// Total number of chunks in a collection.
    async fn chunk_count(&self, collection: &str) -> Result<usize>;

    /// Names of all collections that hold at least one chunk.
    async fn list_collections(&self) -> Result<Vec<String>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_source_label() {
        let mut chunk = test_support::stored_chunk("doc", "handbook.txt", 0, "text", vec![]);
        assert_eq!(chunk.source_label(), "handbook.txt");
        chunk.chunk.page = Some(3);
        assert_eq!(chunk.source_label(), "handbook.txt (page 3)");
    }
}
