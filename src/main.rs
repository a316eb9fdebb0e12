//! Lese CLI entry point.

use anyhow::Result;
use clap::Parser;
use lese::cli::{commands, Cli, Commands};
use lese::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lese={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Ingest { path, collection } => {
            commands::run_ingest(path, collection, settings).await?;
        }

        Commands::Ask {
            question,
            collection,
            top_k,
            no_stream,
        } => {
            commands::run_ask(question, collection, *top_k, *no_stream, settings).await?;
        }

        Commands::Search {
            query,
            collection,
            limit,
            min_score,
        } => {
            commands::run_search(query, collection, *limit, *min_score, settings).await?;
        }

        Commands::Chat { collection } => {
            commands::run_chat(collection, settings).await?;
        }

        Commands::List { collection } => {
            commands::run_list(collection, settings).await?;
        }

        Commands::Remove {
            document_id,
            collection,
        } => {
            commands::run_remove(document_id, collection, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
