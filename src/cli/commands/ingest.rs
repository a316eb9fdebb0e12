//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::Ingestor;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, collection: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = Path::new(path);
    if !path.exists() {
        Output::error(&format!("Path not found: {}", path.display()));
        anyhow::bail!("path not found: {}", path.display());
    }

    let ingestor = Ingestor::new(&settings)?;

    if path.is_dir() {
        let spinner = Output::spinner(&format!("Indexing documents in {}...", path.display()));
        let batch = ingestor.ingest_directory(path, collection).await;
        spinner.finish_and_clear();

        let batch = match batch {
            Ok(b) => b,
            Err(e) => {
                Output::error(&format!("Failed to read directory: {}", e));
                return Err(e.into());
            }
        };

        for result in &batch.succeeded {
            Output::success(&format!(
                "Indexed '{}' ({} chunks)",
                result.document_name, result.chunks_created
            ));
        }
        for (name, error) in &batch.failed {
            Output::warning(&format!("Skipped '{}': {}", name, error));
        }

        if batch.succeeded.is_empty() && batch.failed.is_empty() {
            Output::info("No supported documents found (.txt, .md).");
        } else {
            println!();
            Output::kv("Indexed", &batch.succeeded.len().to_string());
            Output::kv("Failed", &batch.failed.len().to_string());
        }

        if batch.succeeded.is_empty() && !batch.failed.is_empty() {
            anyhow::bail!("all documents failed to ingest");
        }
    } else {
        let spinner = Output::spinner(&format!("Indexing {}...", path.display()));
        match ingestor.ingest_file(path, collection).await {
            Ok(result) => {
                spinner.finish_and_clear();
                Output::success(&format!(
                    "Indexed '{}' into '{}' ({} chunks)",
                    result.document_name, collection, result.chunks_created
                ));
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Failed to ingest: {}", e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
