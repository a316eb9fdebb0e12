//! Candidate reranking after the vector search.
//!
//! The vector store returns an over-fetched pool ordered by cosine
//! similarity; a reranker may reorder that pool before it is cut down to
//! the final top-k handed to the answer composer.

use crate::vector_store::ScoredCandidate;
use std::collections::HashSet;

/// Reranking strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RerankStrategy {
    /// Keep the vector store ordering untouched.
    None,
    /// Reorder by query-term overlap (default).
    #[default]
    Lexical,
}

impl RerankStrategy {
    /// Whether this strategy actually reorders candidates. Used to decide
    /// if over-fetching is worth the extra work.
    pub fn is_active(&self) -> bool {
        !matches!(self, RerankStrategy::None)
    }
}

impl std::str::FromStr for RerankStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "identity" => Ok(RerankStrategy::None),
            "lexical" => Ok(RerankStrategy::Lexical),
            _ => Err(format!("Unknown rerank strategy: {} (expected none, lexical)", s)),
        }
    }
}

impl std::fmt::Display for RerankStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RerankStrategy::None => write!(f, "none"),
            RerankStrategy::Lexical => write!(f, "lexical"),
        }
    }
}

/// Trait for reordering retrieval candidates.
///
/// Implementations must be a pure reordering: same candidates in, same
/// candidates out, only the order and `rerank_score` fields may change.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate>;
}

/// Create a reranker for the given strategy.
pub fn create_reranker(strategy: RerankStrategy) -> Box<dyn Reranker> {
    match strategy {
        RerankStrategy::None => Box::new(IdentityReranker),
        RerankStrategy::Lexical => Box::new(LexicalReranker),
    }
}

/// Reranker that keeps the vector store ordering.
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, _query: &str, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        candidates
    }
}

/// Reranker scoring candidates by distinct query-term overlap.
///
/// Cheap lexical signal layered over the embedding similarity: the score
/// is the fraction of distinct query terms that occur in the chunk. Ties
/// fall back to the original similarity score, and the sort is stable so
/// fully-equal candidates keep their retrieval order.
pub struct LexicalReranker;

impl LexicalReranker {
    fn terms(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }

    fn overlap_score(query_terms: &HashSet<String>, content: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let chunk_terms = Self::terms(content);
        let matched = query_terms.iter().filter(|t| chunk_terms.contains(*t)).count();
        matched as f32 / query_terms.len() as f32
    }
}

impl Reranker for LexicalReranker {
    fn rerank(&self, query: &str, mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let query_terms = Self::terms(query);

        for candidate in &mut candidates {
            candidate.rerank_score =
                Some(Self::overlap_score(&query_terms, &candidate.chunk.chunk.content));
        }

        candidates.sort_by(|a, b| {
            let by_rerank = b
                .rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal);
            by_rerank.then_with(|| {
                b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_support::stored_chunk;

    fn candidate(seq: u32, content: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            chunk: stored_chunk("doc1", "a.txt", seq, content, vec![1.0, 0.0]),
            score,
            rerank_score: None,
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("lexical".parse::<RerankStrategy>().unwrap(), RerankStrategy::Lexical);
        assert_eq!("none".parse::<RerankStrategy>().unwrap(), RerankStrategy::None);
        assert_eq!("NONE".parse::<RerankStrategy>().unwrap(), RerankStrategy::None);
        assert!("cross-encoder".parse::<RerankStrategy>().is_err());
    }

    #[test]
    fn test_identity_keeps_order() {
        let candidates = vec![candidate(0, "alpha", 0.2), candidate(1, "beta", 0.9)];
        let reranked = IdentityReranker.rerank("beta", candidates);
        assert_eq!(reranked[0].chunk.chunk.seq, 0);
        assert_eq!(reranked[1].chunk.chunk.seq, 1);
    }

    #[test]
    fn test_lexical_promotes_term_overlap() {
        let candidates = vec![
            candidate(0, "Payroll runs on the last business day of the month.", 0.9),
            candidate(1, "Refunds are issued within 14 days of a request.", 0.8),
        ];
        let reranked = LexicalReranker.rerank("when are refunds issued", candidates);
        assert_eq!(reranked[0].chunk.chunk.seq, 1);
        assert!(reranked[0].rerank_score.unwrap() > reranked[1].rerank_score.unwrap());
    }

    #[test]
    fn test_lexical_tie_falls_back_to_similarity() {
        // Neither chunk shares a term with the query, so the original
        // similarity ordering decides.
        let candidates = vec![
            candidate(0, "alpha alpha alpha", 0.4),
            candidate(1, "beta beta beta", 0.7),
        ];
        let reranked = LexicalReranker.rerank("gamma", candidates);
        assert_eq!(reranked[0].chunk.chunk.seq, 1);
        assert_eq!(reranked[1].chunk.chunk.seq, 0);
    }

    #[test]
    fn test_rerank_is_pure_reordering() {
        let candidates = vec![
            candidate(0, "refund policy details", 0.5),
            candidate(1, "dress code details", 0.5),
        ];
        let reranked = LexicalReranker.rerank("refund", candidates);
        assert_eq!(reranked.len(), 2);
        // Both candidates survive, with original scores intact.
        assert!(reranked.iter().all(|c| (c.score - 0.5).abs() < f32::EPSILON));
    }
}
