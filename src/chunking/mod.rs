//! Overlap-aware text chunking.
//!
//! Splits document text into overlapping passages sized for embedding, with
//! boundaries that prefer paragraph breaks, then line breaks, then sentence
//! ends, then word boundaries, before falling back to a hard character cut.
//! Deterministic for identical input and configuration.

use crate::error::{LeseError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentence-ending punctuation recognized by the boundary search.
const SENTENCE_ENDS: &[char] = &['.', '!', '?'];

/// A chunk of document text with provenance metadata.
///
/// Offsets are character offsets into the extracted document text, so
/// neighbors' shared overlap can be reconstructed for citation display and
/// re-ingestion dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk id, derived from document id, sequence index and the
    /// chunking configuration. Identical input yields identical ids.
    pub id: Uuid,
    /// Source document id.
    pub document_id: String,
    /// Position of this chunk in the document.
    pub seq: u32,
    /// Text content of this chunk.
    pub content: String,
    /// Start offset (in characters) into the document text.
    pub start_offset: usize,
    /// End offset (exclusive, in characters) into the document text.
    pub end_offset: usize,
    /// Page number, when the source format provides one.
    pub page: Option<u32>,
}

impl Chunk {
    /// Derive the stable id for a chunk.
    pub fn derive_id(document_id: &str, seq: u32, chunk_size: usize, overlap: usize) -> Uuid {
        let name = format!("{}:{}:{}:{}", document_id, seq, chunk_size, overlap);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }
}

/// Configuration for the chunker.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters of chunk *i* re-included at the start of chunk *i+1*.
    pub overlap: usize,
}

impl ChunkConfig {
    /// Create a validated configuration.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(LeseError::Config("chunk_size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(LeseError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }
}

/// Splits document text into overlapping chunks.
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// Create a chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Split a document's text into ordered chunks.
    ///
    /// Empty input produces zero chunks. The last chunk may be shorter than
    /// `chunk_size` but is never empty.
    pub fn chunk(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let ChunkConfig { chunk_size, overlap } = self.config;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut seq = 0u32;

        loop {
            let window_end = (start + chunk_size).min(total);
            let end = if window_end == total {
                total
            } else {
                find_cut(&chars, start + overlap + 1, window_end)
            };

            let content: String = chars[start..end].iter().collect();
            chunks.push(Chunk {
                id: Chunk::derive_id(document_id, seq, chunk_size, overlap),
                document_id: document_id.to_string(),
                seq,
                content,
                start_offset: start,
                end_offset: end,
                page: None,
            });

            if end == total {
                break;
            }
            // find_cut guarantees end > start + overlap, so this always advances.
            start = end - overlap;
            seq += 1;
        }

        chunks
    }

    /// The configuration this chunker was built with.
    pub fn config(&self) -> ChunkConfig {
        self.config
    }
}

/// Find the best cut position in `(min_cut..=window_end)`.
///
/// Tries separators from largest to smallest granularity: paragraph break,
/// line break, sentence end, word boundary. Falls back to a hard cut at the
/// window end when none is found. The lower bound keeps every cut past the
/// overlap region so consecutive chunks always make forward progress.
fn find_cut(chars: &[char], min_cut: usize, window_end: usize) -> usize {
    debug_assert!(min_cut <= window_end);

    // Paragraph break: cut just after "\n\n".
    for pos in (min_cut..=window_end).rev() {
        if pos >= 2 && chars[pos - 1] == '\n' && chars[pos - 2] == '\n' {
            return pos;
        }
    }

    // Line break: cut just after '\n'.
    for pos in (min_cut..=window_end).rev() {
        if pos >= 1 && chars[pos - 1] == '\n' {
            return pos;
        }
    }

    // Sentence end: cut after punctuation followed by whitespace.
    for pos in (min_cut..=window_end).rev() {
        if pos >= 2
            && SENTENCE_ENDS.contains(&chars[pos - 2])
            && chars[pos - 1].is_whitespace()
        {
            return pos;
        }
    }

    // Word boundary: cut after whitespace.
    for pos in (min_cut..=window_end).rev() {
        if pos >= 1 && chars[pos - 1].is_whitespace() {
            return pos;
        }
    }

    // Hard character cut.
    window_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(ChunkConfig::new(chunk_size, overlap).unwrap())
    }

    /// Re-concatenating chunks while dropping overlap-shared text reproduces
    /// the original text exactly.
    fn reconstruct(text: &str, chunks: &[Chunk]) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::new();
        let mut covered = 0usize;
        for chunk in chunks {
            assert!(chunk.start_offset <= covered);
            let fresh: String = chars[covered..chunk.end_offset].iter().collect();
            out.push_str(&fresh);
            covered = chunk.end_offset;
        }
        out
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        assert!(chunker(100, 20).chunk("doc", "").is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(100, 100).is_err());
        assert!(ChunkConfig::new(100, 150).is_err());
        assert!(ChunkConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunks = chunker(100, 20).chunk("doc", "Just a short note.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Just a short note.");
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 18);
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    Pack my box with five dozen liquor jugs. \
                    How vexingly quick daft zebras jump! \
                    Sphinx of black quartz, judge my vow."
            .repeat(5);
        let chunks = chunker(120, 30).chunk("doc", &text);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_overlap_shared_between_neighbors() {
        let text = "word ".repeat(200);
        let chunks = chunker(100, 25).chunk("doc", &text);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_offset, pair[0].end_offset - 25);
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let para1 = "Our refund policy allows employees and customers to request a full \
refund within thirty days of purchase. Requests are reviewed by the finance team \
and processed within five business days.";
        let para2 = "The dress code is casual on Fridays for everyone in the office. \
Suits are required for client meetings and formal occasions such as board reviews.";
        let text = format!("{}\n\n{}", para1, para2);
        let chunks = chunker(200, 50).chunk("handbook.txt", &text);
        assert!(chunks.len() > 1);

        // The first cut should land on the paragraph break, keeping the
        // first paragraph's sentences intact.
        assert!(chunks[0].content.ends_with("business days.\n\n"));
        assert!(chunks.last().unwrap().content.ends_with("board reviews."));

        // No mid-word cuts anywhere.
        for chunk in &chunks[..chunks.len() - 1] {
            let last = chunk.content.chars().last().unwrap();
            assert!(last.is_whitespace() || last == '.', "mid-word cut: {:?}", chunk.content);
        }
    }

    #[test]
    fn test_falls_back_to_sentence_then_word() {
        // No paragraph or line breaks: should cut after a sentence end.
        let text = "First sentence here. Second sentence follows. Third one closes.";
        let chunks = chunker(30, 5).chunk("doc", &text);
        assert!(chunks.len() > 1);
        assert!(chunks[0].content.ends_with(". "));

        // No sentence ends at all: should cut on whitespace, not mid-word.
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunker(20, 4).chunk("doc", text);
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.content.ends_with(' '), "cut mid-word: {:?}", chunk.content);
        }
    }

    #[test]
    fn test_hard_cut_without_any_separator() {
        let text = "x".repeat(250);
        let chunks = chunker(100, 10).chunk("doc", &text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].content.len(), 100);
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "Grønnsaker er sunt. Blåbær også. ".repeat(20);
        let chunks = chunker(50, 10).chunk("doc", &text);
        assert_eq!(reconstruct(&text, &chunks), text);
    }

    #[test]
    fn test_chunk_ids_stable_across_runs() {
        let text = "Some repeatable content. ".repeat(30);
        let a = chunker(100, 20).chunk("doc-1", &text);
        let b = chunker(100, 20).chunk("doc-1", &text);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.content, y.content);
        }

        // Different document or config changes the ids.
        let c = chunker(100, 20).chunk("doc-2", &text);
        assert_ne!(a[0].id, c[0].id);
        let d = chunker(100, 30).chunk("doc-1", &text);
        assert_ne!(a[0].id, d[0].id);
    }

    #[test]
    fn test_last_chunk_never_empty() {
        // Text length just past a cut boundary still yields non-empty chunks.
        for len in [99, 100, 101, 120, 121] {
            let text = "a".repeat(len);
            let chunks = chunker(100, 20).chunk("doc", &text);
            assert!(chunks.iter().all(|c| !c.content.is_empty()), "len {}", len);
        }
    }
}
