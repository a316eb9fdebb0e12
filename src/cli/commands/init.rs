//! Init command - interactive first-run setup.

use crate::cli::Output;
use crate::config::{GenerationProvider, Settings};
use console::style;
use std::io::{self, Write};

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Lese Setup");
    println!();
    println!("Welcome to Lese! Let's make sure everything is configured correctly.\n");

    // Step 1: Check the generation backend
    println!("{}", style("Step 1: Checking backend configuration").bold().cyan());
    println!();

    match settings.generation.provider {
        GenerationProvider::Ollama => {
            let base_url = settings
                .generation
                .effective_base_url()
                .unwrap_or_default();
            Output::info(&format!("Using local Ollama server at {}", base_url));
            println!();
            println!("  Make sure Ollama is running and the models are pulled:");
            println!("  {}", style(format!("ollama pull {}", settings.generation.model)).green());
            println!("  {}", style(format!("ollama pull {}", settings.embedding.model)).green());
        }
        GenerationProvider::OpenAI => {
            if std::env::var("OPENAI_API_KEY").is_err() {
                Output::warning("OPENAI_API_KEY environment variable is not set.");
                println!();
                println!("  Get your API key from: {}", style("https://platform.openai.com/api-keys").underlined());
                println!();
                println!("  Set it in your shell configuration (~/.bashrc, ~/.zshrc, etc.):");
                println!("  {}", style("export OPENAI_API_KEY='sk-...'").green());
                println!();

                if !prompt_continue("Continue without API key?")? {
                    println!();
                    Output::info("Setup cancelled. Set your API key and run 'lese init' again.");
                    return Ok(());
                }
            } else {
                Output::success("OpenAI API key is configured!");
            }
        }
    }

    println!();

    // Step 2: Create directories
    println!("{}", style("Step 2: Setting up directories").bold().cyan());
    println!();

    let data_dir = settings.data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        Output::success(&format!("Created data directory: {}", data_dir.display()));
    } else {
        Output::info(&format!("Data directory exists: {}", data_dir.display()));
    }

    println!();

    // Step 3: Create config file
    println!("{}", style("Step 3: Configuration file").bold().cyan());
    println!();

    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else if prompt_continue("Create default configuration file?")? {
        settings.save_to(&config_path)?;
        Output::success(&format!("Created config file: {}", config_path.display()));
        println!();
        println!("  Edit your config with: {}", style("lese config edit").green());
    } else {
        Output::info("Skipped config file creation. Using defaults.");
    }

    println!();

    // Summary
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Index your first documents", style("lese ingest <path>").cyan());
    println!("  {} Ask questions about them", style("lese ask \"<question>\"").cyan());
    println!("  {} Explore interactively", style("lese chat").cyan());
    println!();
    println!("For more help: {}", style("lese --help").cyan());

    Ok(())
}

/// Prompt user for yes/no confirmation.
fn prompt_continue(message: &str) -> io::Result<bool> {
    print!("{} {} ", style("?").cyan(), message);
    print!("{} ", style("[y/N]").dim());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_lowercase() == "y" || input.trim().to_lowercase() == "yes")
}
