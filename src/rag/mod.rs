//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Ties together query embedding, vector search, reranking and grounded
//! answer generation with citations that always map back to stored chunks.

pub mod context;
mod engine;
mod generator;
mod rerank;
mod retriever;

pub use context::{format_context_for_prompt, resolve_citations};
pub use engine::{RagEngine, RagResponse, INSUFFICIENT_CONTEXT_ANSWER};
pub use generator::{Generator, OpenAIGenerator};
pub use rerank::{create_reranker, IdentityReranker, LexicalReranker, Reranker, RerankStrategy};
pub use retriever::Retriever;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A resolved citation pointing at a stored chunk.
#[derive(Debug, Clone)]
pub struct Citation {
    /// The label the model used, e.g. "S1".
    pub label: String,
    /// Cited chunk id.
    pub chunk_id: Uuid,
    /// Source document id.
    pub document_id: String,
    /// Origin file name for display.
    pub document_name: String,
    /// Page number, when known.
    pub page: Option<u32>,
    /// Character offsets of the cited chunk in its document.
    pub start_offset: usize,
    /// End offset (exclusive).
    pub end_offset: usize,
    /// Short excerpt of the cited chunk.
    pub snippet: String,
    /// Similarity score the chunk was retrieved with.
    pub score: f32,
}

/// One completed question/answer exchange in a session.
///
/// Held in process memory only; cancelled turns are never recorded.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// The user's question.
    pub query: String,
    /// The generated answer.
    pub answer: String,
    /// Ids of the chunks the answer cited.
    pub cited_chunk_ids: Vec<Uuid>,
    /// When the turn completed.
    pub timestamp: DateTime<Utc>,
}
