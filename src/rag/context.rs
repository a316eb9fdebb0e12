//! Context assembly and citation resolution.
//!
//! Retrieved chunks are rendered into the prompt with stable `[S1]`-style
//! labels; after generation the same labels are parsed back out of the
//! answer and resolved to the chunks they came from.

use super::Citation;
use crate::vector_store::ScoredCandidate;
use regex::Regex;
use std::sync::OnceLock;

const SNIPPET_CHARS: usize = 160;

/// Label for the candidate at a given position, 1-based: "S1", "S2", ...
pub fn source_label(index: usize) -> String {
    format!("S{}", index + 1)
}

/// Render candidates into the excerpt block of the generation prompt.
///
/// Each chunk is prefixed with its label and origin so the model can cite
/// it, e.g. `[S1] handbook.txt (page 3)`.
pub fn format_context_for_prompt(candidates: &[ScoredCandidate]) -> String {
    let mut sections = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        sections.push(format!(
            "[{}] {}\n{}",
            source_label(i),
            candidate.chunk.source_label(),
            candidate.chunk.chunk.content.trim()
        ));
    }
    sections.join("\n\n---\n\n")
}

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[S(\d+)\]").unwrap())
}

/// Resolve `[Sn]` labels in an answer back to the retrieved chunks.
///
/// Citations come back in order of first appearance, deduplicated. Labels
/// that do not correspond to a provided candidate are dropped; the model
/// inventing a source never produces a citation.
pub fn resolve_citations(answer: &str, candidates: &[ScoredCandidate]) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for capture in citation_pattern().captures_iter(answer) {
        let Ok(number) = capture[1].parse::<usize>() else {
            continue;
        };
        if number == 0 || number > candidates.len() {
            continue;
        }
        let label = format!("S{}", number);
        if citations.iter().any(|c| c.label == label) {
            continue;
        }

        let candidate = &candidates[number - 1];
        let chunk = &candidate.chunk.chunk;
        citations.push(Citation {
            label,
            chunk_id: chunk.id,
            document_id: chunk.document_id.clone(),
            document_name: candidate.chunk.document_name.clone(),
            page: chunk.page,
            start_offset: chunk.start_offset,
            end_offset: chunk.end_offset,
            snippet: snippet(&chunk.content),
            score: candidate.score,
        });
    }

    citations
}

fn snippet(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}
