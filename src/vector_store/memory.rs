//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets. Chunks are kept in insertion order
//! per collection so equal-score candidates come back deterministically.

use super::{cosine_similarity, IndexedDocument, ScoredCandidate, StoredChunk, VectorStore};
use crate::error::{LeseError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, collection: &str, chunks: &[StoredChunk]) -> Result<usize> {
        let mut collections = self.collections.write().unwrap();
        let entries = collections.entry(collection.to_string()).or_default();

        // All vectors in a collection must share one dimensionality; reject
        // the whole batch before mutating anything.
        if let Some(expected) = entries
            .first()
            .map(|c| c.embedding.len())
            .or_else(|| chunks.first().map(|c| c.embedding.len()))
        {
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(LeseError::VectorStore(format!(
                    "Embedding dimension mismatch in collection '{}': expected {}, got {} \
                     for chunk {}. Check the embedding model and dimensions settings.",
                    collection,
                    expected,
                    bad.embedding.len(),
                    bad.chunk.id
                )));
            }
        }

        for chunk in chunks {
            // Replacing keeps the original position so insertion order stays
            // meaningful for tie-breaking.
            match entries.iter_mut().find(|c| c.chunk.id == chunk.chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => entries.push(chunk.clone()),
            }
        }
        Ok(chunks.len())
    }

    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let mut collections = self.collections.write().unwrap();
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let initial_len = entries.len();
        entries.retain(|c| c.chunk.document_id != document_id);
        Ok(initial_len - entries.len())
    }

    async fn query_with_threshold(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>> {
        let collections = self.collections.read().unwrap();
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        if let Some(stored) = entries.first() {
            if stored.embedding.len() != embedding.len() {
                return Err(LeseError::Embedding(format!(
                    "Query vector has {} dimensions but collection '{}' stores {}. \
                     Check the embedding model and dimensions settings.",
                    embedding.len(),
                    collection,
                    stored.embedding.len()
                )));
            }
        }

        let mut results: Vec<ScoredCandidate> = entries
            .iter()
            .map(|chunk| ScoredCandidate {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, &chunk.embedding),
                rerank_score: None,
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        Ok(results)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<IndexedDocument>> {
        let collections = self.collections.read().unwrap();
        let Some(entries) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut documents: Vec<IndexedDocument> = Vec::new();
        for chunk in entries {
            match documents
                .iter_mut()
                .find(|d| d.document_id == chunk.chunk.document_id)
            {
                Some(doc) => {
                    doc.chunk_count += 1;
                    if chunk.ingested_at > doc.ingested_at {
                        doc.ingested_at = chunk.ingested_at;
                    }
                }
                None => documents.push(IndexedDocument {
                    document_id: chunk.chunk.document_id.clone(),
                    document_name: chunk.document_name.clone(),
                    chunk_count: 1,
                    ingested_at: chunk.ingested_at,
                }),
            }
        }

        documents.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        Ok(documents)
    }

    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<IndexedDocument>> {
        let documents = self.list_documents(collection).await?;
        Ok(documents.into_iter().find(|d| d.document_id == document_id))
    }

    async fn chunk_count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().unwrap();
        Ok(collections.get(collection).map(|e| e.len()).unwrap_or(0))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let collections = self.collections.read().unwrap();
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::stored_chunk;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let c1 = stored_chunk("doc1", "handbook.txt", 0, "Hello world", vec![1.0, 0.0, 0.0]);
        let c2 = stored_chunk("doc1", "handbook.txt", 1, "Goodbye world", vec![0.0, 1.0, 0.0]);

        store.upsert_batch("documents", &[c1, c2]).await.unwrap();

        assert_eq!(store.chunk_count("documents").await.unwrap(), 2);

        let results = store.query("documents", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let documents = store.list_documents("documents").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].chunk_count, 2);
    }

    #[tokio::test]
    async fn test_collection_isolation() {
        let store = MemoryVectorStore::new();

        let a = stored_chunk("doc1", "a.txt", 0, "in collection a", vec![1.0, 0.0]);
        let b = stored_chunk("doc2", "b.txt", 0, "in collection b", vec![1.0, 0.0]);
        store.upsert_batch("alpha", &[a]).await.unwrap();
        store.upsert_batch("beta", &[b]).await.unwrap();

        let results = store.query("alpha", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk.document_id, "doc1");

        assert_eq!(store.list_collections().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty_not_error() {
        let store = MemoryVectorStore::new();
        let results = store.query("nonexistent", &[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(store.chunk_count("nonexistent").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_chunk_id() {
        let store = MemoryVectorStore::new();

        let original = stored_chunk("doc1", "a.txt", 0, "old text", vec![1.0, 0.0]);
        let replacement = stored_chunk("doc1", "a.txt", 0, "new text", vec![0.0, 1.0]);
        assert_eq!(original.chunk.id, replacement.chunk.id);

        store.upsert_batch("documents", &[original]).await.unwrap();
        store.upsert_batch("documents", &[replacement]).await.unwrap();

        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
        let results = store.query("documents", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.chunk.content, "new text");
    }

    #[tokio::test]
    async fn test_delete_document_cascades_to_chunks() {
        let store = MemoryVectorStore::new();

        let chunks = vec![
            stored_chunk("doc1", "a.txt", 0, "one", vec![1.0, 0.0]),
            stored_chunk("doc1", "a.txt", 1, "two", vec![0.0, 1.0]),
            stored_chunk("doc2", "b.txt", 0, "three", vec![1.0, 1.0]),
        ];
        store.upsert_batch("documents", &chunks).await.unwrap();

        let deleted = store.delete_document("documents", "doc1").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
        assert!(!store.is_document_indexed("documents", "doc1").await.unwrap());
        assert!(store.is_document_indexed("documents", "doc2").await.unwrap());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = MemoryVectorStore::new();

        let c = stored_chunk("doc1", "a.txt", 0, "three dims", vec![1.0, 0.0, 0.0]);
        store.upsert_batch("documents", &[c]).await.unwrap();

        // Querying with a different dimensionality is an error, not a
        // silent zero-score match.
        let err = store
            .query("documents", &[1.0, 0.0, 0.0, 0.0], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::Embedding(_)));

        // So is upserting a chunk whose vector doesn't fit the collection,
        // and the store is left untouched.
        let bad = stored_chunk("doc2", "b.txt", 0, "four dims", vec![1.0, 0.0, 0.0, 0.0]);
        let err = store.upsert_batch("documents", &[bad]).await.unwrap_err();
        assert!(matches!(err, LeseError::VectorStore(_)));
        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_insertion_order() {
        let store = MemoryVectorStore::new();

        let chunks = vec![
            stored_chunk("doc1", "a.txt", 0, "first", vec![1.0, 0.0]),
            stored_chunk("doc1", "a.txt", 1, "second", vec![1.0, 0.0]),
            stored_chunk("doc1", "a.txt", 2, "third", vec![1.0, 0.0]),
        ];
        store.upsert_batch("documents", &chunks).await.unwrap();

        let results = store.query("documents", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk.seq, 0);
        assert_eq!(results[1].chunk.chunk.seq, 1);
    }
}
