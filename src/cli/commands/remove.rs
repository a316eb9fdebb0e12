//! Remove command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::LeseError;
use crate::ingest::Ingestor;
use anyhow::Result;

/// Run the remove command.
pub async fn run_remove(document_id: &str, collection: &str, settings: Settings) -> Result<()> {
    let ingestor = Ingestor::new(&settings)?;

    let removed = ingestor.remove_document(collection, document_id).await?;
    if removed == 0 {
        let err = LeseError::DocumentNotFound(document_id.to_string());
        Output::error(&format!("{}", err));
        Output::info("Use 'lese list' to see indexed document ids.");
        return Err(err.into());
    }

    Output::success(&format!(
        "Removed '{}' from '{}' ({} chunks)",
        document_id, collection, removed
    ));
    Ok(())
}
