//! Lese - Document Question Answering with RAG
//!
//! A local-first CLI tool for chatting with your documents.
//!
//! The name "Lese" comes from the Norwegian/Scandinavian word for "read."
//!
//! # Overview
//!
//! Lese allows you to:
//! - Ingest text and markdown documents into named collections
//! - Ask questions and get AI-powered answers with citations
//! - Search through your documents semantically
//! - Keep everything on your own machine (works against a local Ollama server)
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `extract` - Document text extraction
//! - `chunking` - Overlap-aware text chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `ingest` - Ingestion pipeline coordination
//! - `rag` - Retrieval, reranking and answer composition
//!
//! # Example
//!
//! ```rust,no_run
//! use lese::config::Settings;
//! use lese::ingest::Ingestor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let ingestor = Ingestor::new(&settings)?;
//!
//!     let result = ingestor.ingest_file("handbook.txt".as_ref(), "documents").await?;
//!     println!("Ingested {} chunks", result.chunks_created);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod openai;
pub mod rag;
pub mod retry;
pub mod vector_store;

pub use error::{LeseError, Result};
