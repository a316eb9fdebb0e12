//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::ingest::Ingestor;
use crate::rag::RagEngine;
use anyhow::Result;
use std::io::Write;
use tokio::sync::mpsc;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    collection: &str,
    top_k: Option<usize>,
    no_stream: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(k) = top_k {
        settings.retrieval.top_k = k;
    }

    let ingestor = Ingestor::new(&settings)?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let mut engine = RagEngine::new(ingestor.embedder(), ingestor.vector_store(), &settings)?
        .with_prompts(prompts);

    let spinner = Output::spinner("Searching documents...");

    let result = if no_stream {
        let result = engine.ask(question, collection).await;
        spinner.finish_and_clear();
        if let Ok(response) = &result {
            println!("\n{}", response.answer);
        }
        result
    } else {
        let (tx, mut rx) = mpsc::channel::<String>(32);
        let printer = tokio::spawn(async move {
            let mut first = true;
            while let Some(token) = rx.recv().await {
                if first {
                    println!();
                    first = false;
                }
                print!("{}", token);
                std::io::stdout().flush().ok();
            }
            if !first {
                println!();
            }
        });

        spinner.finish_and_clear();
        let result = engine.ask_streaming(question, collection, tx).await;
        printer.await.ok();

        // The insufficient-context answer is fixed text, never streamed.
        if let Ok(response) = &result {
            if response.sources.is_empty() {
                println!("\n{}", response.answer);
            }
        }
        result
    };

    match result {
        Ok(response) => {
            if !response.citations.is_empty() {
                Output::header("Sources");
                for citation in &response.citations {
                    Output::search_result(
                        &format!("[{}] {}", citation.label, citation.document_name),
                        citation.score,
                        &citation.snippet,
                    );
                }
                println!();
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
