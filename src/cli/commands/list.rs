//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::Ingestor;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(collection: &str, settings: Settings) -> Result<()> {
    let ingestor = Ingestor::new(&settings)?;

    match ingestor.vector_store().list_documents(collection).await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info(&format!(
                    "No documents indexed in '{}' yet. Use 'lese ingest <path>' to add some.",
                    collection
                ));
            } else {
                Output::header(&format!("Indexed Documents ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(
                        &doc.document_name,
                        &doc.document_id,
                        doc.chunk_count,
                        doc.ingested_at,
                    );
                }

                let total_chunks: u32 = documents.iter().map(|d| d.chunk_count).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            Err(e.into())
        }
    }
}
