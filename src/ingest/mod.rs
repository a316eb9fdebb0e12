//! Ingestion pipeline for Lese.
//!
//! Coordinates extraction, chunking, embedding and storage for a document.
//! Each document moves through Received, Chunked, Embedded and Stored before
//! reaching Complete; any failure surfaces the originating error and leaves
//! previously ingested documents untouched.

use crate::chunking::{ChunkConfig, TextChunker};
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{LeseError, Result};
use crate::extract::{self, SourceDocument};
use crate::vector_store::{SqliteVectorStore, StoredChunk, VectorStore};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Ingestion state for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Extracted text received.
    Received,
    /// Text split into chunks.
    Chunked,
    /// Embeddings generated for all chunks.
    Embedded,
    /// Chunks and vectors written to the store.
    Stored,
    /// Pipeline finished.
    Complete,
    /// Pipeline aborted; the error carries the cause.
    Failed,
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestStatus::Received => "received",
            IngestStatus::Chunked => "chunked",
            IngestStatus::Embedded => "embedded",
            IngestStatus::Stored => "stored",
            IngestStatus::Complete => "complete",
            IngestStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result of ingesting one document.
#[derive(Debug)]
pub struct IngestionResult {
    /// Document id.
    pub document_id: String,
    /// Origin file name.
    pub document_name: String,
    /// Number of chunks stored.
    pub chunks_created: usize,
    /// Final status.
    pub status: IngestStatus,
}

/// Result of ingesting a directory of documents.
///
/// Failures are isolated per document: one unreadable file never aborts the
/// rest of the batch.
#[derive(Debug, Default)]
pub struct BatchIngestResult {
    pub succeeded: Vec<IngestionResult>,
    pub failed: Vec<(String, LeseError)>,
}

/// The ingestion orchestrator.
pub struct Ingestor {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    // Serializes the delete/upsert pair per (collection, document id) so
    // concurrent re-ingestion of the same document cannot interleave.
    document_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Ingestor {
    /// Create an ingestor from settings, with the default SQLite store.
    pub fn new(settings: &Settings) -> Result<Self> {
        let chunker = TextChunker::new(ChunkConfig::new(
            settings.chunking.chunk_size,
            settings.chunking.overlap,
        )?);

        let base_url = settings.generation.effective_base_url();
        let embedder = Arc::new(
            OpenAIEmbedder::new(
                base_url.as_deref(),
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )
            .with_batch_size(settings.embedding.batch_size),
        );

        let store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        Ok(Self::with_components(chunker, embedder, store))
    }

    /// Create an ingestor with custom components.
    pub fn with_components(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            document_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Ingest a file into a collection.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path, collection: &str) -> Result<IngestionResult> {
        let document = extract::extract_file(path)?;
        self.ingest_document(&document, collection).await
    }

    /// Ingest an extracted document into a collection.
    ///
    /// Re-ingesting the same document replaces all its chunks; chunk ids are
    /// stable for identical content and configuration, so ingesting twice
    /// leaves the collection exactly as ingesting once.
    #[instrument(skip(self, document), fields(document_id = %document.id))]
    pub async fn ingest_document(
        &self,
        document: &SourceDocument,
        collection: &str,
    ) -> Result<IngestionResult> {
        debug!(status = %IngestStatus::Received, "Ingesting {}", document.file_name);

        let chunks = self.chunker.chunk(&document.id, &document.text);
        debug!(status = %IngestStatus::Chunked, "Created {} chunks", chunks.len());

        if chunks.is_empty() {
            // Nothing to embed; still drop any chunks from a previous,
            // non-empty version of this document.
            let lock = self.document_lock(collection, &document.id);
            let _guard = lock.lock().await;
            let removed = self.store.delete_document(collection, &document.id).await?;
            if removed > 0 {
                warn!("Document {} is now empty; removed {} stale chunks", document.id, removed);
            }
            return Ok(IngestionResult {
                document_id: document.id.clone(),
                document_name: document.file_name.clone(),
                chunks_created: 0,
                status: IngestStatus::Complete,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        debug!(status = %IngestStatus::Embedded, "Generated {} embeddings", embeddings.len());

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                StoredChunk::new(chunk, document.file_name.clone(), embedding)
            })
            .collect();

        // Delete-then-upsert under the per-document lock makes re-ingestion
        // idempotent without leaving a window where another ingest of the
        // same document interleaves.
        let lock = self.document_lock(collection, &document.id);
        let _guard = lock.lock().await;
        self.store.delete_document(collection, &document.id).await?;
        let count = self.store.upsert_batch(collection, &stored).await?;
        debug!(status = %IngestStatus::Stored, "Stored {} chunks", count);

        info!(
            "Ingested '{}' into '{}' ({} chunks)",
            document.file_name, collection, count
        );

        Ok(IngestionResult {
            document_id: document.id.clone(),
            document_name: document.file_name.clone(),
            chunks_created: count,
            status: IngestStatus::Complete,
        })
    }

    /// Ingest every supported file in a directory into a collection.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn ingest_directory(&self, dir: &Path, collection: &str) -> Result<BatchIngestResult> {
        let mut result = BatchIngestResult::default();

        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && extract::is_supported(p))
            .collect();
        entries.sort();

        for path in entries {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("<unnamed>")
                .to_string();

            match self.ingest_file(&path, collection).await {
                Ok(ingested) => result.succeeded.push(ingested),
                Err(e) => {
                    warn!(status = %IngestStatus::Failed, "Failed to ingest {}: {}", name, e);
                    result.failed.push((name, e));
                }
            }
        }

        Ok(result)
    }

    /// Remove a document and all its chunks from a collection.
    pub async fn remove_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let lock = self.document_lock(collection, document_id);
        let _guard = lock.lock().await;
        self.store.delete_document(collection, document_id).await
    }

    fn document_lock(&self, collection: &str, document_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = format!("{}/{}", collection, document_id);
        let mut locks = self.document_locks.lock().unwrap();
        locks.entry(key).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_support::{FailingEmbedder, HashEmbedder};
    use crate::extract::extract_text;
    use crate::vector_store::MemoryVectorStore;

    fn ingestor(embedder: Arc<dyn Embedder>) -> (Ingestor, Arc<dyn VectorStore>) {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let chunker = TextChunker::new(ChunkConfig::new(200, 50).unwrap());
        (
            Ingestor::with_components(chunker, embedder, store.clone()),
            store,
        )
    }

    fn handbook() -> SourceDocument {
        let text = "Our refund policy allows customers to request a full refund within \
thirty days of purchase. Refund requests are reviewed by the finance team and \
processed within five business days.\n\nThe dress code is casual on Fridays for \
everyone in the office. Suits are required for client meetings and formal occasions.";
        extract_text("handbook.txt", text.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_stores_chunks() {
        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        let result = ingestor.ingest_document(&handbook(), "documents").await.unwrap();

        assert_eq!(result.status, IngestStatus::Complete);
        assert!(result.chunks_created > 0);
        assert_eq!(
            store.chunk_count("documents").await.unwrap(),
            result.chunks_created
        );
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        let doc = handbook();

        let first = ingestor.ingest_document(&doc, "documents").await.unwrap();
        let second = ingestor.ingest_document(&doc, "documents").await.unwrap();

        assert_eq!(first.chunks_created, second.chunks_created);
        assert_eq!(store.chunk_count("documents").await.unwrap(), first.chunks_created);

        // Chunk ids are stable, so the stored set is identical.
        let query = HashEmbedder::new().embed("refund").await.unwrap();
        let candidates = store.query("documents", &query, 100).await.unwrap();
        let mut ids: Vec<_> = candidates.iter().map(|c| c.chunk.chunk.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first.chunks_created);
    }

    #[tokio::test]
    async fn test_empty_document_completes_with_zero_chunks() {
        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        let doc = extract_text("empty.txt", b"").unwrap();

        let result = ingestor.ingest_document(&doc, "documents").await.unwrap();
        assert_eq!(result.status, IngestStatus::Complete);
        assert_eq!(result.chunks_created, 0);
        assert_eq!(store.chunk_count("documents").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_as_empty_removes_stale_chunks() {
        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        ingestor.ingest_document(&handbook(), "documents").await.unwrap();
        assert!(store.chunk_count("documents").await.unwrap() > 0);

        let empty = extract_text("handbook.txt", b"").unwrap();
        let result = ingestor.ingest_document(&empty, "documents").await.unwrap();
        assert_eq!(result.chunks_created, 0);
        assert_eq!(store.chunk_count("documents").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_prior_documents_queryable() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let chunker = TextChunker::new(ChunkConfig::new(200, 50).unwrap());

        let healthy =
            Ingestor::with_components(chunker, Arc::new(HashEmbedder::new()), store.clone());
        healthy.ingest_document(&handbook(), "documents").await.unwrap();
        let before = store.chunk_count("documents").await.unwrap();

        let chunker = TextChunker::new(ChunkConfig::new(200, 50).unwrap());
        let broken = Ingestor::with_components(chunker, Arc::new(FailingEmbedder), store.clone());
        let doc = extract_text("newdoc.txt", b"Some new content that will fail to embed.").unwrap();
        let err = broken.ingest_document(&doc, "documents").await.unwrap_err();

        assert!(matches!(err, LeseError::ServiceUnavailable(_)));
        // The earlier document is untouched and still queryable.
        assert_eq!(store.chunk_count("documents").await.unwrap(), before);
        let embedder = HashEmbedder::new();
        let query = embedder.embed("refund policy").await.unwrap();
        assert!(!store.query("documents", &query, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_directory_ingest_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "Readable content for ingestion.").unwrap();
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0xfd]).unwrap();

        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        let result = ingestor.ingest_directory(dir.path(), "documents").await.unwrap();

        assert_eq!(result.succeeded.len(), 1);
        assert_eq!(result.succeeded[0].document_name, "good.txt");
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, "bad.txt");
        assert!(matches!(result.failed[0].1, LeseError::Extraction(_)));
        assert!(store.chunk_count("documents").await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_remove_document() {
        let (ingestor, store) = ingestor(Arc::new(HashEmbedder::new()));
        ingestor.ingest_document(&handbook(), "documents").await.unwrap();

        let removed = ingestor.remove_document("documents", "handbook.txt").await.unwrap();
        assert!(removed > 0);
        assert_eq!(store.chunk_count("documents").await.unwrap(), 0);
    }
}
