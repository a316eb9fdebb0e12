//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large datasets, consider using sqlite-vec
//! extension or a dedicated vector database.

use super::{cosine_similarity, IndexedDocument, ScoredCandidate, StoredChunk, VectorStore};
use crate::chunking::Chunk;
use crate::error::{LeseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT NOT NULL,
        collection TEXT NOT NULL,
        document_id TEXT NOT NULL,
        document_name TEXT NOT NULL,
        seq INTEGER NOT NULL,
        content TEXT NOT NULL,
        start_offset INTEGER NOT NULL,
        end_offset INTEGER NOT NULL,
        page INTEGER,
        embedding BLOB NOT NULL,
        ingested_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(collection, document_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LeseError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Dimensionality of the vectors already stored in a collection, if any.
    /// Embeddings are stored as little-endian f32, four bytes per dimension.
    fn stored_dimensions(conn: &Connection, collection: &str) -> Result<Option<usize>> {
        let bytes: Option<i64> = conn
            .query_row(
                "SELECT length(embedding) FROM chunks WHERE collection = ?1 LIMIT 1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| b as usize / 4))
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<StoredChunk> {
        let id_str: String = row.get(0)?;
        let start_offset: i64 = row.get(5)?;
        let end_offset: i64 = row.get(6)?;
        let page: Option<i64> = row.get(7)?;
        let embedding_bytes: Vec<u8> = row.get(8)?;
        let ingested_at_str: String = row.get(9)?;

        Ok(StoredChunk {
            chunk: Chunk {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                document_id: row.get(1)?,
                seq: row.get(3)?,
                content: row.get(4)?,
                start_offset: start_offset as usize,
                end_offset: end_offset as usize,
                page: page.map(|p| p as u32),
            },
            document_name: row.get(2)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            ingested_at: DateTime::parse_from_rfc3339(&ingested_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

const CHUNK_COLUMNS: &str =
    "id, document_id, document_name, seq, content, start_offset, end_offset, page, embedding, ingested_at";

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks))]
    async fn upsert_batch(&self, collection: &str, chunks: &[StoredChunk]) -> Result<usize> {
        let conn = self.lock()?;

        // All vectors in a collection must share one dimensionality; reject
        // the whole batch before writing anything.
        if let Some(expected) = Self::stored_dimensions(&conn, collection)?
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

        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            let embedding_bytes = Self::embedding_to_bytes(&chunk.embedding);

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, collection, document_id, document_name, seq, content,
                 start_offset, end_offset, page, embedding, ingested_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    chunk.chunk.id.to_string(),
                    collection,
                    chunk.chunk.document_id,
                    chunk.document_name,
                    chunk.chunk.seq,
                    chunk.chunk.content,
                    chunk.chunk.start_offset as i64,
                    chunk.chunk.end_offset as i64,
                    chunk.chunk.page.map(|p| p as i64),
                    embedding_bytes,
                    chunk.ingested_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks into '{}'", chunks.len(), collection);
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND document_id = ?2",
            params![collection, document_id],
        )?;

        info!(
            "Deleted {} chunks for document {} in '{}'",
            deleted, document_id, collection
        );
        Ok(deleted)
    }

    #[instrument(skip(self, embedding))]
    async fn query_with_threshold(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>> {
        let conn = self.lock()?;

        if let Some(stored) = Self::stored_dimensions(&conn, collection)? {
            if stored != embedding.len() {
                return Err(LeseError::Embedding(format!(
                    "Query vector has {} dimensions but collection '{}' stores {}. \
                     Check the embedding model and dimensions settings.",
                    embedding.len(),
                    collection,
                    stored
                )));
            }
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE collection = ?1 ORDER BY rowid",
            CHUNK_COLUMNS
        ))?;

        let rows = stmt.query_map(params![collection], Self::row_to_chunk)?;

        let mut results: Vec<ScoredCandidate> = rows
            .filter_map(|row| row.ok())
            .map(|chunk| {
                let score = cosine_similarity(embedding, &chunk.embedding);
                ScoredCandidate {
                    chunk,
                    score,
                    rerank_score: None,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort keeps insertion order for equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        debug!("Found {} matching chunks in '{}'", results.len(), collection);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, document_name, COUNT(*) as chunk_count,
                   MAX(ingested_at) as ingested_at
            FROM chunks
            WHERE collection = ?1
            GROUP BY document_id
            ORDER BY ingested_at DESC
            "#,
        )?;

        let documents = stmt.query_map(params![collection], |row| {
            let ingested_at_str: String = row.get(3)?;
            Ok(IndexedDocument {
                document_id: row.get(0)?,
                document_name: row.get(1)?,
                chunk_count: row.get(2)?,
                ingested_at: DateTime::parse_from_rfc3339(&ingested_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(documents.filter_map(|d| d.ok()).collect())
    }

    #[instrument(skip(self))]
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<IndexedDocument>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT document_id, document_name, COUNT(*) as chunk_count,
                   MAX(ingested_at) as ingested_at
            FROM chunks
            WHERE collection = ?1 AND document_id = ?2
            GROUP BY document_id
            "#,
        )?;

        let document = stmt.query_row(params![collection, document_id], |row| {
            let ingested_at_str: String = row.get(3)?;
            Ok(IndexedDocument {
                document_id: row.get(0)?,
                document_name: row.get(1)?,
                chunk_count: row.get(2)?,
                ingested_at: DateTime::parse_from_rfc3339(&ingested_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        });

        match document {
            Ok(d) => Ok(Some(d)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn chunk_count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT DISTINCT collection FROM chunks ORDER BY collection")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::stored_chunk;

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let chunk = stored_chunk(
            "handbook.txt",
            "handbook.txt",
            0,
            "This is test content",
            vec![1.0, 0.0, 0.0],
        );

        store.upsert_batch("documents", &[chunk]).await.unwrap();

        let documents = store.list_documents("documents").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].document_id, "handbook.txt");

        let results = store.query("documents", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk.chunk.content, "This is test content");

        let deleted = store.delete_document("documents", "handbook.txt").await.unwrap();
        assert_eq!(deleted, 1);

        let documents = store.list_documents("documents").await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_collection_isolation() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let a = stored_chunk("doc1", "a.txt", 0, "alpha content", vec![1.0, 0.0]);
        let b = stored_chunk("doc2", "b.txt", 0, "beta content", vec![1.0, 0.0]);
        store.upsert_batch("alpha", &[a]).await.unwrap();
        store.upsert_batch("beta", &[b]).await.unwrap();

        let results = store.query("alpha", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk.document_id, "doc1");

        assert_eq!(store.list_collections().await.unwrap(), vec!["alpha", "beta"]);
        assert!(store.query("gamma", &[1.0, 0.0], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            let chunk = stored_chunk("doc1", "a.txt", 0, "persistent", vec![0.5, 0.5]);
            store.upsert_batch("documents", &[chunk]).await.unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
        let results = store.query("documents", &[0.5, 0.5], 1).await.unwrap();
        assert_eq!(results[0].chunk.chunk.content, "persistent");
    }

    #[tokio::test]
    async fn test_sqlite_dimension_mismatch_is_rejected() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let c = stored_chunk("doc1", "a.txt", 0, "three dims", vec![1.0, 0.0, 0.0]);
        store.upsert_batch("documents", &[c]).await.unwrap();

        let err = store
            .query("documents", &[1.0, 0.0, 0.0, 0.0], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, LeseError::Embedding(_)));

        let bad = stored_chunk("doc2", "b.txt", 0, "four dims", vec![1.0, 0.0, 0.0, 0.0]);
        let err = store.upsert_batch("documents", &[bad]).await.unwrap_err();
        assert!(matches!(err, LeseError::VectorStore(_)));
        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_upsert_replaces_atomically() {
        let store = SqliteVectorStore::in_memory().unwrap();

        let original = stored_chunk("doc1", "a.txt", 0, "old", vec![1.0, 0.0]);
        let replacement = stored_chunk("doc1", "a.txt", 0, "new", vec![0.0, 1.0]);

        store.upsert_batch("documents", &[original]).await.unwrap();
        store.upsert_batch("documents", &[replacement]).await.unwrap();

        assert_eq!(store.chunk_count("documents").await.unwrap(), 1);
        let results = store.query("documents", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.chunk.content, "new");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }
}
