//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::Ingestor;
use crate::rag::Retriever;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    collection: &str,
    limit: usize,
    min_score: f32,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let ingestor = Ingestor::new(&settings)?;
    let retriever = Retriever::new(ingestor.embedder(), ingestor.vector_store(), &settings.retrieval)?
        .with_top_k(limit)
        .with_min_score(min_score);

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(query, collection).await;
    spinner.finish_and_clear();

    match results {
        Ok(candidates) => {
            if candidates.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", candidates.len()));

                for candidate in &candidates {
                    Output::search_result(
                        &candidate.chunk.source_label(),
                        candidate.score,
                        &candidate.chunk.chunk.content,
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            Err(e.into())
        }
    }
}
