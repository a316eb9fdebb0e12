//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::LeseError;
use crate::ingest::Ingestor;
use crate::rag::RagEngine;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

/// Run the interactive chat command.
pub async fn run_chat(collection: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let ingestor = Ingestor::new(&settings)?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let mut engine = RagEngine::new(ingestor.embedder(), ingestor.vector_store(), &settings)?
        .with_prompts(prompts);

    let chunk_count = ingestor.vector_store().chunk_count(collection).await?;
    if chunk_count == 0 {
        Output::warning(&format!(
            "Collection '{}' is empty. Use 'lese ingest <path>' to add documents first.",
            collection
        ));
    }

    println!("\n{}", style("Lese Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            engine.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        print!("\n{} ", style("Lese:").cyan().bold());
        stdout.flush()?;

        let (tx, mut rx) = mpsc::channel::<String>(32);
        let printer = tokio::spawn(async move {
            while let Some(token) = rx.recv().await {
                print!("{}", token);
                std::io::stdout().flush().ok();
            }
        });

        match engine.chat_streaming(input, collection, tx).await {
            Ok(response) => {
                printer.await.ok();
                // The insufficient-context answer is fixed text, never streamed.
                if response.sources.is_empty() {
                    print!("{}", response.answer);
                }
                println!("\n");
                if !response.citations.is_empty() {
                    let labels: Vec<String> = response
                        .citations
                        .iter()
                        .map(|c| format!("[{}] {}", c.label, c.document_name))
                        .collect();
                    println!("{}\n", style(labels.join("  ")).dim());
                }
            }
            Err(LeseError::Cancelled) => {
                printer.await.ok();
                println!();
                Output::info("Answer cancelled.");
            }
            Err(e) => {
                printer.await.ok();
                println!();
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
