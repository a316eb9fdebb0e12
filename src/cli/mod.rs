//! CLI module for Lese.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lese - Document Q&A over your own files
///
/// A local-first CLI tool for indexing text documents and asking questions
/// answered from their content, with citations back to the source. The name
/// "Lese" comes from the Norwegian word for "read."
#[derive(Parser, Debug)]
#[command(name = "lese")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Lese and write a default configuration
    Init,

    /// Index a document or a directory of documents
    Ingest {
        /// Path to a .txt/.md file, or a directory of them
        path: String,

        /// Collection to ingest into
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,
    },

    /// Ask a question and get an answer grounded in your documents
    Ask {
        /// The question to ask
        question: String,

        /// Collection to answer from
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,

        /// Number of context chunks handed to the model
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the full answer at once instead of streaming tokens
        #[arg(long)]
        no_stream: bool,
    },

    /// Search for relevant document chunks without generating an answer
    Search {
        /// Search query
        query: String,

        /// Collection to search
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.0")]
        min_score: f32,
    },

    /// Start an interactive chat session over a collection
    Chat {
        /// Collection to chat with
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,
    },

    /// List indexed documents
    List {
        /// Collection to list
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,
    },

    /// Remove a document and all its chunks from the index
    Remove {
        /// Document id (as shown by 'lese list')
        document_id: String,

        /// Collection to remove from
        #[arg(short = 'n', long, default_value = "documents")]
        collection: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "generation.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
